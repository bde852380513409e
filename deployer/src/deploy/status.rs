//! Post-deployment status report

use tracing::warn;

use crate::deploy::docker::DockerCli;
use crate::exec::Executor;
use crate::models::result::StatusSnapshot;
use crate::utils::tail_lines;

/// Fetches the workload's status table and recent logs.
///
/// Purely informational: a failed fetch yields empty fields, never an error.
pub struct StatusReporter<'a> {
    executor: &'a dyn Executor,
    docker: &'a DockerCli,
    tail: usize,
}

impl<'a> StatusReporter<'a> {
    pub fn new(executor: &'a dyn Executor, docker: &'a DockerCli, tail: usize) -> Self {
        Self {
            executor,
            docker,
            tail,
        }
    }

    pub async fn report(&self) -> StatusSnapshot {
        let status = match self.executor.run(&self.docker.ps()).await {
            Ok(output) if output.success() => output.stdout.trim_end().to_string(),
            Ok(output) => {
                warn!("Status query failed: {}", output.diagnostic());
                String::new()
            }
            Err(e) => {
                warn!("Status query failed: {}", e);
                String::new()
            }
        };

        let recent_logs = match self.executor.run(&self.docker.logs(self.tail)).await {
            Ok(output) if output.success() => tail_lines(&output.stdout, self.tail),
            Ok(output) => {
                warn!("Log fetch failed: {}", output.diagnostic());
                Vec::new()
            }
            Err(e) => {
                warn!("Log fetch failed: {}", e);
                Vec::new()
            }
        };

        StatusSnapshot {
            status,
            recent_logs,
        }
    }
}
