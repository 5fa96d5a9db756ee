//! Configuration management for bootpack.
//!
//! Reads configuration from the environment (`main` loads `.env` first with
//! dotenvy, so real environment variables win over the file). CLI flags are
//! applied on top through [`Overrides`]. The resulting [`BuildConfig`] is
//! read-only for the whole run.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::{BuildProfile, DeviceId, DeviceProfile, ModuleFilter};

/// Default signing key, relative to the base directory.
pub const DEFAULT_AVB_KEY: &str = "keys/testkey_rsa4096.pem";

/// Toolchain selection, passed through untouched to the kernel build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainConfig {
    pub arch: String,
    pub cc: Option<String>,
    pub ld: Option<String>,
    pub cross_compile: Option<String>,
    pub cross_compile_arm32: Option<String>,
    pub clang_triple: Option<String>,
    pub llvm: bool,
    pub defconfig: Option<String>,
}

impl ToolchainConfig {
    /// `make` variable assignments for this toolchain, `ARCH=` first.
    pub fn make_vars(&self) -> Vec<String> {
        let mut vars = vec![format!("ARCH={}", self.arch)];
        let optional = [
            ("CC", &self.cc),
            ("LD", &self.ld),
            ("CROSS_COMPILE", &self.cross_compile),
            ("CROSS_COMPILE_ARM32", &self.cross_compile_arm32),
            ("CLANG_TRIPLE", &self.clang_triple),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                vars.push(format!("{}={}", key, value));
            }
        }
        if self.llvm {
            vars.push("LLVM=1".to_string());
        }
        vars
    }

    /// The `strip` matching this toolchain.
    pub fn strip_tool(&self) -> String {
        if self.llvm {
            "llvm-strip".to_string()
        } else {
            format!("{}strip", self.cross_compile.as_deref().unwrap_or(""))
        }
    }
}

/// External programs, by name on `PATH` or by explicit path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tools {
    pub make: String,
    pub mkdtimg: String,
    pub mkbootimg: String,
    pub avbtool: String,
    pub cpio: String,
    pub gzip: String,
    pub modinfo: String,
    pub strip: String,
}

/// Values supplied on the command line. `None` keeps the environment value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub device: Option<DeviceId>,
    pub jobs: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub dist_dir: Option<PathBuf>,
    pub skip_kernel_build: bool,
    pub module_filter: Option<ModuleFilter>,
    pub timeout_secs: Option<u64>,
}

/// Immutable run configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    pub device: DeviceId,
    pub profile: DeviceProfile,
    /// Capabilities in effect (profile default, possibly with a CLI module filter).
    pub build: BuildProfile,
    pub jobs: usize,
    pub kernel_source: PathBuf,
    /// Kernel build-output tree.
    pub out_dir: PathBuf,
    /// Distribution tree: staged artifacts and finished images.
    pub dist_dir: PathBuf,
    pub avb_key: PathBuf,
    pub dt_config_dir: PathBuf,
    pub fstab_dir: PathBuf,
    pub ramdisk_source: PathBuf,
    pub modules_load: PathBuf,
    pub firmware_dir: PathBuf,
    pub toolchain: ToolchainConfig,
    pub tools: Tools,
    pub tool_timeout: Option<Duration>,
    pub skip_kernel_build: bool,
}

impl BuildConfig {
    /// Load configuration from the process environment.
    pub fn load(base_dir: &Path, overrides: &Overrides) -> Result<Self> {
        Self::load_with(base_dir, overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit map (tests, `show config`).
    pub fn from_map(
        base_dir: &Path,
        overrides: &Overrides,
        vars: &HashMap<String, String>,
    ) -> Result<Self> {
        Self::load_with(base_dir, overrides, |key| vars.get(key).cloned())
    }

    /// Load configuration, reading variables through `lookup`.
    pub fn load_with<F>(base_dir: &Path, overrides: &Overrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, default: &str| {
            let raw = var(key).unwrap_or_else(|| default.to_string());
            resolve(base_dir, &raw)
        };

        let device = match overrides.device {
            Some(device) => device,
            None => match var("DEVICE") {
                Some(name) => DeviceId::parse(&name).with_context(|| {
                    format!(
                        "Unknown DEVICE '{}'. Expected one of: {}",
                        name,
                        device_names()
                    )
                })?,
                None => bail!(
                    "No device selected. Pass --device or set DEVICE (one of: {})",
                    device_names()
                ),
            },
        };
        let profile = device.profile();

        let mut build = profile.build;
        let filter = match overrides.module_filter {
            Some(filter) => Some(filter),
            None => match var("MODULE_FILTER") {
                Some(raw) => Some(
                    ModuleFilter::parse(&raw)
                        .with_context(|| format!("Invalid MODULE_FILTER '{}' (drivers|all)", raw))?,
                ),
                None => None,
            },
        };
        if let Some(filter) = filter {
            build.module_filter = filter;
        }

        let jobs = match overrides.jobs {
            Some(jobs) => jobs,
            None => match var("JOBS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid JOBS '{}'", raw))?,
                None => default_jobs(),
            },
        };
        if jobs == 0 {
            bail!("Job count must be at least 1");
        }

        let out_dir = match &overrides.out_dir {
            Some(dir) => resolve(base_dir, &dir.to_string_lossy()),
            None => path("OUT_DIR", "out"),
        };
        let dist_dir = match &overrides.dist_dir {
            Some(dir) => resolve(base_dir, &dir.to_string_lossy()),
            None => match var("DIST_DIR") {
                Some(raw) => resolve(base_dir, &raw),
                None => out_dir.join("dist"),
            },
        };

        let toolchain = ToolchainConfig {
            arch: var("ARCH").unwrap_or_else(|| "arm64".to_string()),
            cc: var("CC"),
            ld: var("LD"),
            cross_compile: var("CROSS_COMPILE"),
            cross_compile_arm32: var("CROSS_COMPILE_ARM32"),
            clang_triple: var("CLANG_TRIPLE"),
            llvm: var("LLVM").map(|v| is_truthy(&v)).unwrap_or(false),
            defconfig: var("DEFCONFIG"),
        };

        let tool = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let tools = Tools {
            make: tool("MAKE", "make"),
            mkdtimg: tool("MKDTIMG", "mkdtimg"),
            mkbootimg: tool("MKBOOTIMG", "mkbootimg"),
            avbtool: tool("AVBTOOL", "avbtool"),
            cpio: tool("CPIO", "cpio"),
            gzip: tool("GZIP", "gzip"),
            modinfo: tool("MODINFO", "modinfo"),
            strip: var("STRIP").unwrap_or_else(|| toolchain.strip_tool()),
        };

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => Some(secs),
            None => match var("TOOL_TIMEOUT_SECS") {
                Some(raw) => Some(
                    raw.trim()
                        .parse()
                        .with_context(|| format!("Invalid TOOL_TIMEOUT_SECS '{}'", raw))?,
                ),
                None => None,
            },
        };

        let skip_kernel_build = overrides.skip_kernel_build
            || var("SKIP_KERNEL_BUILD").map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            device,
            profile,
            build,
            jobs,
            kernel_source: path("KERNEL_SOURCE", "."),
            out_dir,
            dist_dir,
            avb_key: path("AVB_KEY", DEFAULT_AVB_KEY),
            dt_config_dir: path("DT_CONFIG_DIR", "configs/dt"),
            fstab_dir: path("FSTAB_DIR", "configs/fstab"),
            ramdisk_source: path("RAMDISK_SOURCE", "ramdisk"),
            modules_load: path("MODULES_LOAD", "configs/modules.load"),
            firmware_dir: path("VENDOR_FIRMWARE_DIR", "vendor/firmware"),
            toolchain,
            tools,
            tool_timeout: timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            skip_kernel_build,
        })
    }

    /// `arch/<arch>/boot` inside the output tree.
    pub fn boot_dir(&self) -> PathBuf {
        self.out_dir
            .join("arch")
            .join(&self.toolchain.arch)
            .join("boot")
    }

    /// Kernel image produced by the kernel build.
    pub fn kernel_image(&self) -> PathBuf {
        self.boot_dir().join("Image")
    }

    /// Root of the compiled device trees.
    pub fn dts_dir(&self) -> PathBuf {
        self.boot_dir().join("dts")
    }

    /// Path of a finished image or staged artifact in the distribution tree.
    pub fn dist(&self, name: &str) -> PathBuf {
        self.dist_dir.join(name)
    }

    /// Print configuration for `bootpack show config`.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  DEVICE: {} (platform {})", self.device, self.profile.platform);
        println!("  JOBS: {}", self.jobs);
        println!("  KERNEL_SOURCE: {}", self.kernel_source.display());
        println!("  OUT_DIR: {}", self.out_dir.display());
        println!("  DIST_DIR: {}", self.dist_dir.display());
        println!("  AVB_KEY: {}", self.avb_key.display());
        println!("  DT_CONFIG_DIR: {}", self.dt_config_dir.display());
        println!("  FSTAB_DIR: {}", self.fstab_dir.display());
        if self.build.own_ramdisk {
            println!("  RAMDISK_SOURCE: {}", self.ramdisk_source.display());
        }
        println!("  MODULES_LOAD: {}", self.modules_load.display());
        println!("  VENDOR_FIRMWARE_DIR: {}", self.firmware_dir.display());
        println!("  MODULE_FILTER: {:?}", self.build.module_filter);
        println!("  ARCH: {}", self.toolchain.arch);
        println!("  make vars: {}", self.toolchain.make_vars().join(" "));
        match self.tool_timeout {
            Some(t) => println!("  TOOL_TIMEOUT_SECS: {}", t.as_secs()),
            None => println!("  TOOL_TIMEOUT_SECS: none"),
        }
        if self.skip_kernel_build {
            println!("  Kernel build: SKIPPED (reusing {})", self.out_dir.display());
        }
    }
}

fn resolve(base_dir: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn device_names() -> String {
    DeviceId::ALL
        .iter()
        .map(|d| d.codename())
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_jobs() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            log::warn!("Could not detect CPU count ({}), using 4 jobs", e);
            4
        }
    }
}
