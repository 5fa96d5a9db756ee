//! Typed pipeline failures.
//!
//! Stage functions return `anyhow::Result`, raising one of these values as the
//! root error. Callers (and tests) classify a failure with
//! `err.downcast_ref::<PipelineError>()`.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage that raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    KernelBuild,
    Collect,
    Compose,
    Ramdisk,
    Sign,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::KernelBuild => "kernel-build",
            Stage::Collect => "collect",
            Stage::Compose => "compose",
            Stage::Ramdisk => "ramdisk",
            Stage::Sign => "sign",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Key files, config files or source directories absent before a stage starts.
    #[error("Missing prerequisite: {what} not found at {}", .path.display())]
    MissingPrerequisite { what: String, path: PathBuf },

    /// Per-device composer config file is absent.
    #[error("Config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Expected build outputs absent after a prior stage.
    #[error("Artifact not found: {what} (expected at {})", .path.display())]
    ArtifactNotFound { what: String, path: PathBuf },

    /// Non-zero exit (or timeout) from an invoked collaborator.
    #[error("[{stage}] {tool} failed: {detail}")]
    ExternalToolFailure {
        stage: Stage,
        tool: String,
        detail: String,
    },

    /// Signing requested on a non-existent or empty image.
    #[error("Cannot sign {}: image missing or empty", .0.display())]
    ImageMissing(PathBuf),
}

impl PipelineError {
    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingPrerequisite {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::ArtifactNotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// True for a non-zero exit from `mkdtimg` or `mkbootimg`.
    pub fn is_composer_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalToolFailure {
                stage: Stage::Compose,
                ..
            }
        )
    }

    /// True for a non-zero exit from `avbtool`.
    pub fn is_signing_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalToolFailure {
                stage: Stage::Sign,
                ..
            }
        )
    }
}

/// Map a failed `Cmd` run into an `ExternalToolFailure` for `stage`.
///
/// ```ignore
/// Cmd::new(&tools.mkdtimg).args(args).run().map_err(tool_failure(Stage::Compose, "mkdtimg"))?;
/// ```
pub fn tool_failure(stage: Stage, tool: &str) -> impl FnOnce(anyhow::Error) -> PipelineError + '_ {
    move |err| PipelineError::ExternalToolFailure {
        stage,
        tool: tool.to_string(),
        detail: format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_keeps_stage_and_tool() {
        let err = tool_failure(Stage::Sign, "avbtool")(anyhow::anyhow!("exit code 1"));
        assert!(err.is_signing_failure());
        assert!(!err.is_composer_failure());
        let msg = err.to_string();
        assert!(msg.contains("[sign]"));
        assert!(msg.contains("avbtool"));
        assert!(msg.contains("exit code 1"));
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = PipelineError::missing("AVB signing key", "/keys/k.pem");
        assert!(err.to_string().contains("/keys/k.pem"));

        let err = PipelineError::ImageMissing(PathBuf::from("/dist/boot.img"));
        assert!(err.to_string().contains("/dist/boot.img"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = PipelineError::ConfigNotFound(PathBuf::from("a.cfg")).into();
        let err = err.context("Composing dtbo.img");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ConfigNotFound(_))
        ));
    }
}
