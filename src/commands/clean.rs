//! Clean command - removes build artifacts.

use anyhow::Result;

use bootpack::clean;
use bootpack::config::BuildConfig;

/// Clean target for the clean command.
pub enum CleanTarget {
    /// Remove the distribution tree (default)
    Dist,
    /// Remove finished images and archives only
    Images,
}

/// Execute the clean command.
pub fn cmd_clean(config: &BuildConfig, target: CleanTarget) -> Result<()> {
    match target {
        CleanTarget::Dist => clean::clean_dist(config)?,
        CleanTarget::Images => {
            clean::clean_images(config)?;
        }
    }
    Ok(())
}
