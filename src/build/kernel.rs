//! Kernel build collaborator.
//!
//! Runs the kernel's own build system with the configured toolchain. The
//! toolchain variables are passed through to `make` untouched; nothing else
//! in the pipeline reads them.

use anyhow::Result;

use crate::config::BuildConfig;
use crate::error::{tool_failure, PipelineError, Stage};
use crate::process::Cmd;

/// Arguments for one `make` invocation against the output tree.
pub fn make_args(config: &BuildConfig, targets: &[String]) -> Vec<String> {
    let mut args = vec![
        "-C".to_string(),
        config.kernel_source.to_string_lossy().into_owned(),
        format!("O={}", config.out_dir.display()),
    ];
    args.extend(config.toolchain.make_vars());
    args.extend(targets.iter().cloned());
    args
}

/// Build the kernel, device trees and modules into the output tree.
pub fn build_kernel(config: &BuildConfig) -> Result<()> {
    println!("Building kernel from {}...", config.kernel_source.display());

    if !config.kernel_source.join("Makefile").is_file() {
        return Err(PipelineError::missing(
            "kernel source Makefile",
            config.kernel_source.join("Makefile"),
        )
        .into());
    }
    std::fs::create_dir_all(&config.out_dir)?;

    if let Some(defconfig) = &config.toolchain.defconfig {
        println!("  Generating .config from {}...", defconfig);
        Cmd::new(&config.tools.make)
            .args(make_args(config, &[defconfig.clone()]))
            .timeout(config.tool_timeout)
            .error_msg(format!("make {} failed", defconfig))
            .run()
            .map_err(tool_failure(Stage::KernelBuild, "make"))?;
    } else if !config.out_dir.join(".config").is_file() {
        return Err(PipelineError::missing(
            "kernel .config (set DEFCONFIG)",
            config.out_dir.join(".config"),
        )
        .into());
    }

    // Interactive: the user sees compiler progress.
    println!("  Building with {} jobs...", config.jobs);
    Cmd::new(&config.tools.make)
        .args(make_args(config, &[format!("-j{}", config.jobs)]))
        .timeout(config.tool_timeout)
        .error_msg("Kernel build failed")
        .run_interactive()
        .map_err(tool_failure(Stage::KernelBuild, "make"))?;

    let image = config.kernel_image();
    if !image.is_file() {
        return Err(PipelineError::not_found("kernel image", image).into());
    }
    println!("  Kernel image: {}", image.display());
    Ok(())
}
