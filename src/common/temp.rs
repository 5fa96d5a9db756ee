//! Utilities for managing temporary work directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Prepare a work directory, removing it if it exists and creating it fresh.
///
/// # Arguments
/// * `parent_dir` - Parent directory where the work dir should be created
/// * `name` - Name of the work directory (e.g., "dtbo", ".vendor-ramdisk-root")
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    // Clean up if it exists from a previous run
    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .with_context(|| format!("Failed to remove stale {}", work_dir.display()))?;
    }

    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    Ok(work_dir)
}

/// Clean up a work directory after use. Idempotent.
pub fn cleanup_work_dir(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// A work directory that is removed when dropped, on every exit path.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create a fresh `parent_dir/name`, discarding leftovers of an earlier run.
    pub fn create(parent_dir: &Path, name: &str) -> Result<Self> {
        Ok(Self {
            path: prepare_work_dir(parent_dir, name)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        cleanup_work_dir(&self.path);
    }
}
