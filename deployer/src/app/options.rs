//! Runtime options derived from settings

use std::path::PathBuf;
use std::time::Duration;

use crate::settings::Settings;

/// Main deployment options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Source checkout on remote targets
    pub source: SourceOptions,

    /// Deployment root on remote targets
    pub remote_dir: String,

    /// Source tree used by local deployments
    pub local_dir: PathBuf,

    /// ssh configuration
    pub ssh: SshSettings,

    /// Naming of the rendered compose service
    pub compose: ComposeOptions,

    /// Start and verify policy
    pub lifecycle: LifecycleOptions,

    /// Log lines shown in the final status report
    pub status_tail_lines: usize,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for DeployOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            source: SourceOptions {
                repo_url: settings.repo_url.clone().filter(|url| !url.trim().is_empty()),
                branch: settings.branch.clone(),
                fallback_branch: settings.fallback_branch.clone(),
            },
            remote_dir: settings.remote_dir.trim_end_matches('/').to_string(),
            local_dir: PathBuf::from(&settings.local_dir),
            ssh: SshSettings {
                port: settings.ssh_port,
                connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
                probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
            },
            compose: ComposeOptions {
                service_name: settings.service_name.clone(),
                container_name: settings.container_name.clone(),
            },
            lifecycle: LifecycleOptions {
                settle_delay: Duration::from_secs(settings.settle_delay_secs),
                failure_log_lines: settings.log_tail_lines,
            },
            status_tail_lines: settings.status_tail_lines,
        }
    }
}

/// Where the workload source comes from
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Repository cloned on first provisioning of a remote target
    pub repo_url: Option<String>,

    /// Branch pulled on updates
    pub branch: String,

    /// Branch pulled when `branch` cannot be
    pub fallback_branch: String,
}

/// ssh options for remote targets
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub port: u16,

    /// Connect timeout for regular commands
    pub connect_timeout: Duration,

    /// Connect timeout for the negotiation probe
    pub probe_timeout: Duration,
}

/// Compose naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    pub service_name: String,
    pub container_name: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        DeployOptions::default().compose
    }
}

/// Lifecycle options for the workload
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Pause after start before the single readiness poll
    pub settle_delay: Duration,

    /// Log lines attached to a start failure
    pub failure_log_lines: usize,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        DeployOptions::default().lifecycle
    }
}
