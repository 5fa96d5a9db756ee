//! bootpack library exports.
//!
//! The binary drives these modules; integration tests in `tests/` exercise
//! the same stages directly against fake tools.

pub mod artifact;
pub mod build;
pub mod clean;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod timing;

pub use config::{BuildConfig, Overrides};
pub use device::{DeviceId, ModuleFilter};
pub use error::{PipelineError, Stage};
pub use pipeline::PipelineResult;
