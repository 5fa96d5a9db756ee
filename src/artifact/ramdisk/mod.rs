//! Ramdisk assembly.
//!
//! A ramdisk is staged as a plain directory tree ([`RamdiskTree`]) inside the
//! distribution tree, serialized to a gzip-compressed newc cpio archive, and
//! then deleted. The staging directory never outlives the builder call: it is
//! removed on drop, so a failure halfway through leaves nothing behind.
//!
//! - `boot`: boot ramdisk from our own init tree (own-ramdisk variant only)
//! - `vendor`: vendor ramdisk with modules, module metadata, fstab, firmware
//! - `metadata`: `modules.softdep` / `modules.alias` via `modinfo`
//! - `depgen`: `modules.dep` generator
//! - `archive`: cpio + gzip

pub mod archive;
pub mod boot;
pub mod depgen;
pub mod metadata;
pub mod vendor;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::common::WorkDir;
use crate::config::BuildConfig;

pub use boot::build_boot_ramdisk;
pub use vendor::{build_vendor_ramdisk, VendorRamdisk};

/// Staging directory name for the boot ramdisk, under the distribution tree.
pub const BOOT_RAMDISK_ROOT: &str = ".boot-ramdisk-root";
/// Staging directory name for the vendor ramdisk, under the distribution tree.
pub const VENDOR_RAMDISK_ROOT: &str = ".vendor-ramdisk-root";

/// Ephemeral root filesystem of a ramdisk.
#[derive(Debug)]
pub struct RamdiskTree {
    dir: WorkDir,
}

impl RamdiskTree {
    /// Create an empty tree at `parent/name`, discarding any stale one.
    pub fn create(parent: &Path, name: &str) -> Result<Self> {
        Ok(Self {
            dir: WorkDir::create(parent, name)?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel` inside the tree.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root().join(rel)
    }

    /// Serialize the tree into `output` and delete it.
    pub fn archive(self, config: &BuildConfig, output: &Path) -> Result<PathBuf> {
        archive::write_archive(config, self.root(), output)?;
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tree_removed_on_drop() {
        let tmp = TempDir::new().unwrap();
        let root = {
            let tree = RamdiskTree::create(tmp.path(), VENDOR_RAMDISK_ROOT).unwrap();
            std::fs::create_dir_all(tree.join("lib/modules")).unwrap();
            tree.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
