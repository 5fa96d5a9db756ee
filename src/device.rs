//! Device profiles.
//!
//! Everything the bootloader of a target dictates (geometry, partition sizes,
//! where its device trees live) is kept here and looked up once by
//! [`DeviceId`], instead of being spelled out at each tool invocation.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Size of both the `boot` and `vendor_boot` partitions.
pub const BOOT_PARTITION_SIZE: u64 = 67_108_864;

/// Algorithm passed to `avbtool add_hash_footer`.
pub const AVB_ALGORITHM: &str = "SHA256_RSA4096";

/// Supported devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceId {
    Alioth,
    Apollo,
    Lmi,
}

impl DeviceId {
    pub const ALL: [DeviceId; 3] = [DeviceId::Alioth, DeviceId::Apollo, DeviceId::Lmi];

    pub fn codename(self) -> &'static str {
        match self {
            DeviceId::Alioth => "alioth",
            DeviceId::Apollo => "apollo",
            DeviceId::Lmi => "lmi",
        }
    }

    /// Parse a codename, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }

    pub fn profile(self) -> DeviceProfile {
        match self {
            DeviceId::Alioth | DeviceId::Apollo => DeviceProfile::kona(self, BuildProfile::VENDOR_BOOT),
            DeviceId::Lmi => DeviceProfile::kona(self, BuildProfile::OWN_RAMDISK),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

/// Which `modules.order` entries go into the vendor ramdisk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFilter {
    /// Only entries under `drivers/`.
    Drivers,
    /// Every entry.
    All,
}

impl ModuleFilter {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }

    pub fn selects(self, module_path: &str) -> bool {
        match self {
            ModuleFilter::Drivers => module_path.starts_with("drivers/"),
            ModuleFilter::All => true,
        }
    }
}

/// Capability set separating the two pipeline variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildProfile {
    /// Build a boot ramdisk from our own init tree and put it in `boot.img`.
    pub own_ramdisk: bool,
    /// Write `modules.softdep` and `modules.alias` besides `modules.dep`/`modules.load`.
    pub full_module_metadata: bool,
    pub module_filter: ModuleFilter,
}

impl BuildProfile {
    pub const VENDOR_BOOT: BuildProfile = BuildProfile {
        own_ramdisk: false,
        full_module_metadata: true,
        module_filter: ModuleFilter::Drivers,
    };

    pub const OWN_RAMDISK: BuildProfile = BuildProfile {
        own_ramdisk: true,
        full_module_metadata: false,
        module_filter: ModuleFilter::All,
    };
}

/// Boot image header geometry. Must match the bootloader byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootGeometry {
    pub page_size: u32,
    pub base: u64,
    pub kernel_offset: u64,
    pub ramdisk_offset: u64,
    pub dtb_offset: u64,
    pub tags_offset: u64,
    pub header_version: u32,
    pub os_version: &'static str,
    pub os_patch_level: &'static str,
    pub board: &'static str,
    pub vendor_cmdline: &'static str,
}

/// Render an address the way `mkbootimg` expects it.
pub fn hex(value: u64) -> String {
    format!("0x{:08x}", value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionSizes {
    pub boot: u64,
    pub vendor_boot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub id: DeviceId,
    /// SoC platform name; selects the DTB config and fstab name.
    pub platform: &'static str,
    /// DTBO search root, relative to `arch/<arch>/boot/dts`.
    pub dtbo_subpath: String,
    /// DTB search root, relative to `arch/<arch>/boot/dts`.
    pub dtb_subpath: String,
    pub geometry: BootGeometry,
    pub partitions: PartitionSizes,
    pub build: BuildProfile,
}

const KONA_VENDOR_CMDLINE: &str = "console=ttyMSM0,115200n8 androidboot.hardware=qcom \
androidboot.console=ttyMSM0 androidboot.memcg=1 lpm_levels.sleep_disabled=1 \
msm_rtb.filter=0x237 service_locator.enable=1 androidboot.usbcontroller=a600000.dwc3 \
swiotlb=2048 loop.max_part=7 cgroup.memory=nokmem,nosocket reboot=panic_warm";

impl DeviceProfile {
    fn kona(id: DeviceId, build: BuildProfile) -> Self {
        Self {
            id,
            platform: "kona",
            dtbo_subpath: format!("vendor/qcom/{}", id.codename()),
            dtb_subpath: "vendor/qcom".to_string(),
            geometry: BootGeometry {
                page_size: 4096,
                base: 0x0000_0000,
                kernel_offset: 0x0000_8000,
                ramdisk_offset: 0x0100_0000,
                dtb_offset: 0x01f0_0000,
                tags_offset: 0x0000_0100,
                header_version: 3,
                os_version: "13.0.0",
                os_patch_level: "2023-06",
                board: id.codename(),
                vendor_cmdline: KONA_VENDOR_CMDLINE,
            },
            partitions: PartitionSizes {
                boot: BOOT_PARTITION_SIZE,
                vendor_boot: BOOT_PARTITION_SIZE,
            },
            build,
        }
    }

    pub fn codename(&self) -> &'static str {
        self.id.codename()
    }

    /// `mkdtimg` config for the overlay image, e.g. `alioth-dtbo.cfg`.
    pub fn dtbo_config(&self, config_dir: &Path) -> std::path::PathBuf {
        config_dir.join(format!("{}-dtbo.cfg", self.codename()))
    }

    /// `mkdtimg` config for the base DTB image, e.g. `kona-dtb.cfg`.
    pub fn dtb_config(&self, config_dir: &Path) -> std::path::PathBuf {
        config_dir.join(format!("{}-dtb.cfg", self.platform))
    }

    /// fstab file name, both in the source directory and inside the ramdisk.
    pub fn fstab_name(&self) -> String {
        format!("fstab.{}", self.platform)
    }

    /// Print the profile for `bootpack show devices`.
    pub fn print(&self) {
        let g = &self.geometry;
        println!("{} (platform {})", self.codename(), self.platform);
        println!(
            "  own ramdisk: {}, full module metadata: {}, modules: {:?}",
            self.build.own_ramdisk, self.build.full_module_metadata, self.build.module_filter
        );
        println!(
            "  pagesize {} base {} kernel {} ramdisk {} dtb {} tags {}",
            g.page_size,
            hex(g.base),
            hex(g.kernel_offset),
            hex(g.ramdisk_offset),
            hex(g.dtb_offset),
            hex(g.tags_offset)
        );
        println!(
            "  header v{} os {} patch {} board '{}'",
            g.header_version, g.os_version, g.os_patch_level, g.board
        );
        println!(
            "  partitions: boot {} vendor_boot {}",
            self.partitions.boot, self.partitions.vendor_boot
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_case_insensitive() {
        assert_eq!(DeviceId::parse("alioth"), Some(DeviceId::Alioth));
        assert_eq!(DeviceId::parse(" LMI "), Some(DeviceId::Lmi));
        assert_eq!(DeviceId::parse("pixel"), None);
    }

    #[test]
    fn test_variants_map_to_capabilities() {
        let vendor = DeviceId::Alioth.profile().build;
        assert!(!vendor.own_ramdisk);
        assert!(vendor.full_module_metadata);
        assert_eq!(vendor.module_filter, ModuleFilter::Drivers);

        let own = DeviceId::Lmi.profile().build;
        assert!(own.own_ramdisk);
        assert_eq!(own.module_filter, ModuleFilter::All);
    }

    #[test]
    fn test_partition_sizes_are_fixed() {
        for id in DeviceId::ALL {
            let p = id.profile();
            assert_eq!(p.partitions.boot, 67108864);
            assert_eq!(p.partitions.vendor_boot, 67108864);
        }
    }

    #[test]
    fn test_hex_is_zero_padded() {
        assert_eq!(hex(0), "0x00000000");
        assert_eq!(hex(0x8000), "0x00008000");
        assert_eq!(hex(0x01f0_0000), "0x01f00000");
    }

    #[test]
    fn test_module_filter() {
        assert!(ModuleFilter::Drivers.selects("drivers/net/wlan.ko"));
        assert!(!ModuleFilter::Drivers.selects("fs/exfat/exfat.ko"));
        assert!(!ModuleFilter::Drivers.selects("kernel/drivers/x.ko"));
        assert!(ModuleFilter::All.selects("fs/exfat/exfat.ko"));
    }

    #[test]
    fn test_config_file_names() {
        let p = DeviceId::Apollo.profile();
        let dir = Path::new("/cfg");
        assert_eq!(p.dtbo_config(dir), Path::new("/cfg/apollo-dtbo.cfg"));
        assert_eq!(p.dtb_config(dir), Path::new("/cfg/kona-dtb.cfg"));
        assert_eq!(p.fstab_name(), "fstab.kona");
        assert_eq!(p.dtbo_subpath, "vendor/qcom/apollo");
    }
}
