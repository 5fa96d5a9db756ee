//! Partition images: composition, ramdisks and signing.
//!
//! This module contains all image creation logic:
//! - `dtimg` - `dtbo.img` / `dtb.img` (mkdtimg)
//! - `bootimg` - `boot.img` / `vendor_boot.img` (mkbootimg)
//! - `ramdisk` - boot and vendor ramdisk archives
//! - `avb` - AVB hash footers (avbtool)

pub mod avb;
pub mod bootimg;
pub mod dtimg;
pub mod ramdisk;

pub use avb::{sign_boot_images, sign_image, SignedImage};
pub use bootimg::{build_boot_image, build_vendor_boot_image};
pub use dtimg::{build_dtb_image, build_dtbo_image};
pub use ramdisk::{build_boot_ramdisk, build_vendor_ramdisk, VendorRamdisk};

/// Top-level images a successful run produces, in build order.
pub const IMAGE_NAMES: [&str; 4] = ["dtbo.img", "dtb.img", "boot.img", "vendor_boot.img"];
