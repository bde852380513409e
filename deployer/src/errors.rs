//! Error types for the deployer

use std::time::Duration;

use thiserror::Error;

/// Main error type for a deployment run
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Required tool not found on this machine: {0}")]
    MissingLocalTool(String),

    #[error("Connectivity failure: {0}")]
    ConnectivityFailure(String),

    #[error("Container runtime installation failed: {0}")]
    RuntimeInstallFailure(String),

    #[error("Source sync failed: {0}")]
    SourceSyncFailure(String),

    #[error("Configuration write failed: {0}")]
    ConfigWriteFailure(String),

    #[error("Container failed to start: {reason}")]
    ContainerStartFailure {
        reason: String,
        /// Log lines captured from the workload when the failure was detected
        logs: Vec<String>,
    },

    #[error("Validation error: {0}")]
    ValidationFailure(String),

    #[error("Command `{program}` timed out after {after:?}")]
    CommandTimeout { program: String, after: Duration },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Prompt error: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Short label printed in front of the error line
    pub fn label(&self) -> &'static str {
        match self {
            DeployError::MissingLocalTool(_) => "MISSING TOOL",
            DeployError::ConnectivityFailure(_) => "CONNECTION",
            DeployError::RuntimeInstallFailure(_) => "RUNTIME",
            DeployError::SourceSyncFailure(_) => "SOURCE SYNC",
            DeployError::ConfigWriteFailure(_) => "CONFIG",
            DeployError::ContainerStartFailure { .. } => "START",
            DeployError::ValidationFailure(_) => "INPUT",
            DeployError::CommandTimeout { .. } => "TIMEOUT",
            DeployError::IoError(_)
            | DeployError::JsonError(_)
            | DeployError::YamlError(_)
            | DeployError::PromptError(_)
            | DeployError::Internal(_) => "ERROR",
        }
    }

    /// Log lines attached to the error, if any
    pub fn captured_logs(&self) -> &[String] {
        match self {
            DeployError::ContainerStartFailure { logs, .. } => logs,
            _ => &[],
        }
    }
}
