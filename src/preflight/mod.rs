//! Preflight checks for bootpack.
//!
//! Validates inputs and host tools before starting a build.
//! Run with `bootpack preflight` to check everything is ready; `build` runs
//! [`require_prerequisites`] first and stops at the first missing item.

mod environment;
mod host_tools;
mod types;
mod validators;

use anyhow::Result;

use crate::config::BuildConfig;
use crate::error::PipelineError;

pub use environment::prerequisites;
pub use host_tools::{first_missing_tool, required_tools, HostTool};
pub use types::{CheckResult, CheckStatus, PreflightReport, Prerequisite};

/// Run all preflight checks.
pub fn run_preflight(config: &BuildConfig) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks for {}...\n", config.device);

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(config));

    println!("Checking build environment...");
    checks.extend(environment::check_build_environment(config));

    println!();

    PreflightReport { checks }
}

/// Fail with `MissingPrerequisite` on the first required input or tool that is absent.
pub fn require_prerequisites(config: &BuildConfig) -> Result<()> {
    if let Some(item) = prerequisites(config).into_iter().find(|p| !p.is_present()) {
        return Err(PipelineError::missing(item.what, item.path).into());
    }
    if let Some(tool) = first_missing_tool(config) {
        return Err(PipelineError::missing(
            format!("host tool '{}' ({})", tool.label, tool.purpose),
            tool.program,
        )
        .into());
    }
    Ok(())
}
