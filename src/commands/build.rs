//! Build command - runs the image pipeline.

use anyhow::Result;

use bootpack::config::BuildConfig;
use bootpack::pipeline::{self, PipelineResult};

/// Execute the build command.
pub fn cmd_build(config: &BuildConfig) -> Result<PipelineResult> {
    if config.skip_kernel_build {
        println!("Kernel build skipped: using existing {}\n", config.out_dir.display());
    }
    let result = pipeline::run(config)?;
    result.print();
    println!("\nManifest: {}", config.dist(pipeline::MANIFEST_NAME).display());
    Ok(result)
}
