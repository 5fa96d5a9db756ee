//! Device tree images (`dtbo.img`, `dtb.img`) via `mkdtimg cfg_create`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::build::CollectedArtifacts;
use crate::common::is_nonempty_file;
use crate::config::BuildConfig;
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

/// `mkdtimg cfg_create <image> <config> --dtb-dir=<dir>`
pub fn mkdtimg_args(output: &Path, config_file: &Path, source_dir: &Path) -> Vec<String> {
    vec![
        "cfg_create".to_string(),
        output.to_string_lossy().into_owned(),
        config_file.to_string_lossy().into_owned(),
        format!("--dtb-dir={}", source_dir.display()),
    ]
}

/// Compose `dtbo.img` from the per-device config and the staged `dtbo/` directory.
pub fn build_dtbo_image(config: &BuildConfig) -> Result<PathBuf> {
    let cfg = config.profile.dtbo_config(&config.dt_config_dir);
    compose(
        config,
        &cfg,
        &CollectedArtifacts::overlay_dir(config),
        &config.dist("dtbo.img"),
    )
}

/// Compose `dtb.img` from the platform config and the staged `dtb/` directory.
pub fn build_dtb_image(config: &BuildConfig) -> Result<PathBuf> {
    let cfg = config.profile.dtb_config(&config.dt_config_dir);
    compose(
        config,
        &cfg,
        &CollectedArtifacts::blob_dir(config),
        &config.dist("dtb.img"),
    )
}

fn compose(config: &BuildConfig, cfg: &Path, source_dir: &Path, output: &Path) -> Result<PathBuf> {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Composing {}...", name);

    if !cfg.is_file() {
        return Err(PipelineError::ConfigNotFound(cfg.to_path_buf()).into());
    }
    if !source_dir.is_dir() {
        return Err(PipelineError::not_found("staged device tree directory", source_dir).into());
    }

    Cmd::new(&config.tools.mkdtimg)
        .args(mkdtimg_args(output, cfg, source_dir))
        .timeout(config.tool_timeout)
        .error_msg(format!("mkdtimg failed to create {}", name))
        .run()
        .map_err(tool_failure(Stage::Compose, "mkdtimg"))?;

    if !is_nonempty_file(output) {
        return Err(PipelineError::not_found(name, output).into());
    }
    println!("  Created {}", output.display());
    Ok(output.to_path_buf())
}
