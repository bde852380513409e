//! Settings file management

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Settings file picked up from the working directory when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "miner-deploy.json";

/// Deployer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Source repository cloned onto remote targets
    #[serde(default)]
    pub repo_url: Option<String>,

    /// Branch pulled when updating an existing checkout
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Branch tried when pulling `branch` fails
    #[serde(default = "default_fallback_branch")]
    pub fallback_branch: String,

    /// Deployment root on remote targets
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    /// Source tree used by local deployments
    #[serde(default = "default_local_dir")]
    pub local_dir: String,

    /// ssh port on remote targets
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Compose service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Fixed container name
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// ssh connect timeout for regular commands
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for the connection probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Pause between starting the workload and checking it
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Log lines captured when the workload fails to start
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,

    /// Log lines shown in the final status report
    #[serde(default = "default_status_tail_lines")]
    pub status_tail_lines: usize,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_fallback_branch() -> String {
    "master".to_string()
}

fn default_remote_dir() -> String {
    "/opt/btc-solo-miner".to_string()
}

fn default_local_dir() -> String {
    ".".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_service_name() -> String {
    "btc-miner".to_string()
}

fn default_container_name() -> String {
    "btc-solo-miner".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_settle_delay() -> u64 {
    10
}

fn default_log_tail_lines() -> usize {
    50
}

fn default_status_tail_lines() -> usize {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            repo_url: None,
            branch: default_branch(),
            fallback_branch: default_fallback_branch(),
            remote_dir: default_remote_dir(),
            local_dir: default_local_dir(),
            ssh_port: default_ssh_port(),
            service_name: default_service_name(),
            container_name: default_container_name(),
            connect_timeout_secs: default_connect_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            settle_delay_secs: default_settle_delay(),
            log_tail_lines: default_log_tail_lines(),
            status_tail_lines: default_status_tail_lines(),
        }
    }
}

/// Load settings.
///
/// An explicit path must exist. Without one, [`DEFAULT_SETTINGS_FILE`] in the
/// working directory is used when present, and built-in defaults otherwise.
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, DeployError> {
    let file = match path {
        Some(path) => {
            let file = File::new(path);
            if !file.exists().await {
                return Err(DeployError::ValidationFailure(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            file
        }
        None => {
            let file = File::new(DEFAULT_SETTINGS_FILE);
            if !file.exists().await {
                debug!("No settings file, using defaults");
                return Ok(Settings::default());
            }
            file
        }
    };

    debug!("Loading settings from {}", file.path().display());
    file.read_json::<Settings>().await
}
