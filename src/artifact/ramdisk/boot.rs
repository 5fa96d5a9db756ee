//! Boot ramdisk for the own-ramdisk variant.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use super::{RamdiskTree, BOOT_RAMDISK_ROOT};
use crate::common::{copy_tree, set_mode};
use crate::config::BuildConfig;
use crate::error::PipelineError;

/// `rwxr-x---`
pub const INIT_MODE: u32 = 0o750;

/// Device nodes that get a placeholder symlink under `dev/` when absent.
pub const DEVICE_NODES: [&str; 3] = ["console", "null", "urandom"];

/// Build `ramdisk.cpio.gz` from the configured ramdisk source tree.
pub fn build_boot_ramdisk(config: &BuildConfig) -> Result<PathBuf> {
    println!("Building boot ramdisk from {}...", config.ramdisk_source.display());

    if !config.ramdisk_source.is_dir() {
        return Err(
            PipelineError::missing("boot ramdisk source tree", &config.ramdisk_source).into(),
        );
    }

    let tree = RamdiskTree::create(&config.dist_dir, BOOT_RAMDISK_ROOT)?;
    populate(&config.ramdisk_source, tree.root())?;
    tree.archive(config, &config.dist("ramdisk.cpio.gz"))
}

/// Copy `source` into `root`, fix up `init` and add device placeholders.
pub fn populate(source: &Path, root: &Path) -> Result<()> {
    let files = copy_tree(source, root)?;
    println!("  Copied {} files", files);

    let init = root.join("init");
    if !init.is_file() {
        return Err(PipelineError::missing("init in boot ramdisk source", source.join("init")).into());
    }
    set_mode(&init, INIT_MODE)?;

    create_device_placeholders(root)
}

fn create_device_placeholders(root: &Path) -> Result<()> {
    let dev = root.join("dev");
    fs::create_dir_all(&dev).with_context(|| format!("Failed to create {}", dev.display()))?;

    for node in DEVICE_NODES {
        let link = dev.join(node);
        // symlink_metadata: a dangling link already counts as present
        if link.symlink_metadata().is_ok() {
            continue;
        }
        symlink(format!("/dev/{}", node), &link)
            .with_context(|| format!("Failed to create {}", link.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_populate_sets_init_mode_and_links() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        let root = tmp.path().join("root");
        fs::create_dir_all(source.join("dev")).unwrap();
        fs::write(source.join("init"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(source.join("init"), fs::Permissions::from_mode(0o644)).unwrap();
        symlink("/custom/null", source.join("dev/null")).unwrap();

        populate(&source, &root).unwrap();

        let mode = fs::metadata(root.join("init")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);

        for node in DEVICE_NODES {
            assert!(root.join("dev").join(node).symlink_metadata().is_ok());
        }
        assert_eq!(
            fs::read_link(root.join("dev/console")).unwrap(),
            Path::new("/dev/console")
        );
        // Existing entries are left alone.
        assert_eq!(
            fs::read_link(root.join("dev/null")).unwrap(),
            Path::new("/custom/null")
        );
    }

    #[test]
    fn test_populate_without_init_fails() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();

        let err = populate(&source, &tmp.path().join("root")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingPrerequisite { .. })
        ));
    }
}
