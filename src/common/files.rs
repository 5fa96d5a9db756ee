//! Utilities for file operations with automatic parent directory creation.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use walkdir::WalkDir;

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Set Unix permission bits (e.g. 0o750) on an existing file.
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to chmod {:o} {}", mode, path.display()))
}

/// Copy a file, creating the destination's parent directories.
///
/// An existing destination is overwritten.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Recursively copy `src` into `dst`, preserving symlinks and permission bits.
///
/// Returns the number of regular files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to read {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} escaped {}", entry.path().display(), src.display()))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            symlink(&link, &target)
                .with_context(|| format!("Failed to create symlink {}", target.display()))?;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// True if `path` is a regular file with at least one byte.
pub fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_preserves_links_and_modes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_file_with_dirs(src.join("bin/tool"), "x").unwrap();
        set_mode(&src.join("bin/tool"), 0o755).unwrap();
        symlink("bin/tool", src.join("tool")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();

        let dst = tmp.path().join("dst");
        assert_eq!(copy_tree(&src, &dst).unwrap(), 1);

        let mode = fs::metadata(dst.join("bin/tool")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_link(dst.join("tool")).unwrap(), Path::new("bin/tool"));
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn test_is_nonempty_file() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let full = tmp.path().join("full");
        fs::write(&empty, "").unwrap();
        fs::write(&full, "x").unwrap();

        assert!(!is_nonempty_file(&empty));
        assert!(is_nonempty_file(&full));
        assert!(!is_nonempty_file(tmp.path()));
        assert!(!is_nonempty_file(&tmp.path().join("missing")));
    }
}
