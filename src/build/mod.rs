//! Kernel build and artifact collection.
//!
//! - `kernel`: kernel build collaborator (`make`), optional
//! - `device_tree`: stage `.dtbo`/`.dtb` files into `dtbo/` and `dtb/`
//! - `modules`: select kernel modules from `modules.order`, copy and strip them
//!
//! Everything lands in the distribution tree, which later stages read from.

pub mod device_tree;
pub mod kernel;
pub mod modules;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::common::copy_file;
use crate::config::BuildConfig;
use crate::error::PipelineError;

/// What a staged file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    KernelImage,
    DeviceTreeBlob,
    DeviceTreeOverlay,
    KernelModule,
    Firmware,
}

/// A file copied from the build-output tree into the distribution tree.
///
/// Identity is the destination path: a second artifact with the same file
/// name overwrites the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Artifact {
    /// Copy `source` to `dest_dir/<file name>`.
    pub fn stage(kind: ArtifactKind, source: &Path, dest_dir: &Path) -> Result<Self> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::not_found("file name", source))?;
        let destination = dest_dir.join(&name);
        copy_file(source, &destination)?;
        Ok(Self {
            kind,
            name,
            source: source.to_path_buf(),
            destination,
        })
    }
}

/// Everything the collector staged.
#[derive(Debug, Clone)]
pub struct CollectedArtifacts {
    pub kernel: Artifact,
    pub overlays: Vec<Artifact>,
    pub blobs: Vec<Artifact>,
    pub modules: Vec<Artifact>,
}

impl CollectedArtifacts {
    pub fn overlay_dir(config: &BuildConfig) -> PathBuf {
        config.dist("dtbo")
    }

    pub fn blob_dir(config: &BuildConfig) -> PathBuf {
        config.dist("dtb")
    }
}

/// Run the collection stage: kernel image, device trees and modules.
pub fn collect_artifacts(config: &BuildConfig) -> Result<CollectedArtifacts> {
    println!("Collecting build artifacts from {}...", config.out_dir.display());

    if !config.out_dir.is_dir() {
        return Err(PipelineError::not_found("kernel build-output tree", &config.out_dir).into());
    }

    let kernel_image = config.kernel_image();
    if !kernel_image.is_file() {
        return Err(PipelineError::not_found("kernel image", kernel_image).into());
    }
    let kernel = Artifact::stage(ArtifactKind::KernelImage, &kernel_image, &config.dist_dir)?;
    println!("  Staged {}", kernel.name);

    let (overlays, blobs) = device_tree::collect_device_trees(config)?;
    let modules = modules::collect_modules(config)?;

    Ok(CollectedArtifacts {
        kernel,
        overlays,
        blobs,
        modules,
    })
}
