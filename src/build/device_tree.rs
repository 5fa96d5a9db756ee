//! Device tree collection.
//!
//! DTBOs come from the device's own directory under `arch/<arch>/boot/dts`,
//! DTBs from the platform directory. Both are flattened into per-kind staging
//! directories that `mkdtimg` consumes whole.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Artifact, ArtifactKind, CollectedArtifacts};
use crate::common::prepare_work_dir;
use crate::config::BuildConfig;
use crate::error::PipelineError;

/// Stage all overlays into `dist/dtbo/` and all blobs into `dist/dtb/`.
///
/// Fails with `ArtifactNotFound` if either kind has no file at all.
pub fn collect_device_trees(config: &BuildConfig) -> Result<(Vec<Artifact>, Vec<Artifact>)> {
    let dts = config.dts_dir();
    let profile = &config.profile;

    let overlay_root = dts.join(&profile.dtbo_subpath);
    let overlay_dir = CollectedArtifacts::overlay_dir(config);
    let overlays = stage_matching(
        &overlay_root,
        "dtbo",
        ArtifactKind::DeviceTreeOverlay,
        &overlay_dir,
    )?;
    println!("  Staged {} device tree overlays", overlays.len());

    let blob_root = dts.join(&profile.dtb_subpath);
    let blob_dir = CollectedArtifacts::blob_dir(config);
    let blobs = stage_matching(&blob_root, "dtb", ArtifactKind::DeviceTreeBlob, &blob_dir)?;
    println!("  Staged {} device tree blobs", blobs.len());

    Ok((overlays, blobs))
}

/// Find files with `extension` anywhere under `root`, sorted by path.
pub fn find_with_extension(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

fn stage_matching(
    root: &Path,
    extension: &str,
    kind: ArtifactKind,
    dest: &Path,
) -> Result<Vec<Artifact>> {
    if !root.is_dir() {
        return Err(PipelineError::not_found(format!("{} directory", extension), root).into());
    }

    let sources = find_with_extension(root, extension)?;
    if sources.is_empty() {
        return Err(PipelineError::not_found(format!("*.{} files", extension), root).into());
    }

    let dest_dir = fresh_dir(dest)?;
    let mut staged: Vec<Artifact> = Vec::new();
    for source in sources {
        let artifact = Artifact::stage(kind, &source, &dest_dir)?;
        // Same file name from two subdirectories: the later copy wins.
        staged.retain(|a| a.destination != artifact.destination);
        staged.push(artifact);
    }
    Ok(staged)
}

fn fresh_dir(dir: &Path) -> Result<PathBuf> {
    let parent = dir
        .parent()
        .with_context(|| format!("{} has no parent", dir.display()))?;
    let name = dir
        .file_name()
        .with_context(|| format!("{} has no name", dir.display()))?;
    prepare_work_dir(parent, &name.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::write_file_with_dirs;
    use tempfile::TempDir;

    #[test]
    fn test_find_with_extension_is_recursive_and_exact() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_file_with_dirs(root.join("a/x.dtb"), "x").unwrap();
        write_file_with_dirs(root.join("b/c/y.dtb"), "y").unwrap();
        write_file_with_dirs(root.join("b/z.dtbo"), "z").unwrap();
        write_file_with_dirs(root.join("b/w.dtb.tmp"), "w").unwrap();

        let found = find_with_extension(root, "dtb").unwrap();
        assert_eq!(found, vec![root.join("a/x.dtb"), root.join("b/c/y.dtb")]);
    }

    #[test]
    fn test_duplicate_names_overwrite() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dts");
        write_file_with_dirs(root.join("a/board.dtbo"), "first").unwrap();
        write_file_with_dirs(root.join("b/board.dtbo"), "second").unwrap();

        let dest = tmp.path().join("dist/dtbo");
        let staged =
            stage_matching(&root, "dtbo", ArtifactKind::DeviceTreeOverlay, &dest).unwrap();

        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].source, root.join("b/board.dtbo"));
        assert_eq!(std::fs::read_to_string(dest.join("board.dtbo")).unwrap(), "second");
    }

    #[test]
    fn test_empty_directory_is_artifact_not_found() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("dts")).unwrap();

        let err = stage_matching(
            &tmp.path().join("dts"),
            "dtb",
            ArtifactKind::DeviceTreeBlob,
            &tmp.path().join("dist/dtb"),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ArtifactNotFound { .. })
        ));
    }
}
