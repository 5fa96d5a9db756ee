//! Build artifact cleaning.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::artifact::ramdisk::{BOOT_RAMDISK_ROOT, VENDOR_RAMDISK_ROOT};
use crate::artifact::IMAGE_NAMES;
use crate::config::BuildConfig;
use crate::pipeline::MANIFEST_NAME;

/// Intermediate files in the distribution tree besides the final images.
const INTERMEDIATES: [&str; 2] = ["ramdisk.cpio.gz", "vendor_ramdisk.cpio.gz"];

/// Remove the whole distribution tree (the kernel output tree is kept).
pub fn clean_dist(config: &BuildConfig) -> Result<()> {
    let dist = &config.dist_dir;
    if dist.exists() {
        println!("Removing {}...", dist.display());
        fs::remove_dir_all(dist).with_context(|| format!("Failed to remove {}", dist.display()))?;
        println!("Clean complete (kernel build output preserved).");
    } else {
        println!("Nothing to clean at {}.", dist.display());
    }
    Ok(())
}

/// Remove finished images, ramdisk archives, the manifest and any leftover
/// ramdisk staging trees; staged artifacts stay.
pub fn clean_images(config: &BuildConfig) -> Result<usize> {
    let mut removed = 0;

    let files = IMAGE_NAMES
        .iter()
        .chain(INTERMEDIATES.iter())
        .chain(std::iter::once(&MANIFEST_NAME));
    for name in files {
        let path = config.dist(name);
        if remove_path(&path)? {
            println!("  Removed {}", path.display());
            removed += 1;
        }
    }

    for name in [BOOT_RAMDISK_ROOT, VENDOR_RAMDISK_ROOT] {
        if remove_path(&config.dist(name))? {
            removed += 1;
        }
    }

    if removed == 0 {
        println!("No images to clean.");
    } else {
        println!("Removed {} item(s).", removed);
    }
    Ok(removed)
}

fn remove_path(path: &Path) -> Result<bool> {
    let meta = match path.symlink_metadata() {
        Ok(meta) => meta,
        Err(_) => return Ok(false),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(true)
}
