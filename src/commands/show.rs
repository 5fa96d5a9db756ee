//! Show command - displays information.

use anyhow::Result;

use bootpack::config::BuildConfig;
use bootpack::device::DeviceId;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show resolved configuration
    Config,
    /// Show all device profiles
    Devices,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: Result<BuildConfig>) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config?.print();
        }
        ShowTarget::Devices => {
            for (i, id) in DeviceId::ALL.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                id.profile().print();
            }
        }
    }
    Ok(())
}
