//! Deployment outcome models

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::DeployError;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Connect,
    Provision,
    Configure,
    Start,
    Report,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Provision => "provision",
            Stage::Configure => "configure",
            Stage::Start => "start",
            Stage::Report => "report",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Process status and recent log lines of the workload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Raw status table as printed by the runtime
    pub status: String,
    pub recent_logs: Vec<String>,
}

/// Operational command printed after a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    pub purpose: &'static str,
    pub command: String,
}

/// Outcome of one deployment run. Not persisted.
#[derive(Debug)]
pub struct DeploymentResult {
    /// Last stage entered
    pub stage: Stage,
    pub error: Option<DeployError>,
    pub snapshot: Option<StatusSnapshot>,
    /// Empty unless the run succeeded
    pub follow_up: Vec<FollowUp>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentResult {
    /// A run that has just entered `stage`
    pub fn begin(stage: Stage) -> Self {
        let now = Utc::now();
        Self {
            stage,
            error: None,
            snapshot: None,
            follow_up: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Record the terminal error and stamp the finish time
    pub fn fail(mut self, error: DeployError) -> Self {
        self.error = Some(error);
        self.finished_at = Utc::now();
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
