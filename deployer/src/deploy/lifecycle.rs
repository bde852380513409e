//! Workload start and verification

use tracing::{debug, info, warn};

use crate::app::options::LifecycleOptions;
use crate::deploy::docker::DockerCli;
use crate::deploy::fsm::{LifecycleEvent, LifecycleFsm};
use crate::errors::DeployError;
use crate::exec::Executor;
use crate::utils::tail_lines;

/// Status table token of a running container
pub const RUNNING_MARKER: &str = "Up";

/// Compose diagnostics meaning there was nothing to stop
const NOTHING_TO_STOP: &[&str] = &[
    "no such container",
    "no configuration file",
    "can't find a suitable configuration file",
    "no resource found",
    "no such service",
];

/// Result of the best-effort stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NothingRunning,
}

/// Whether a status table shows a running container
pub fn is_running(status: &str) -> bool {
    status
        .lines()
        .any(|line| line.split_whitespace().any(|token| token == RUNNING_MARKER))
}

fn is_nothing_to_stop(diagnostic: &str) -> bool {
    let diagnostic = diagnostic.to_lowercase();
    NOTHING_TO_STOP.iter().any(|needle| diagnostic.contains(needle))
}

/// Stops, starts and verifies the workload on one target
pub struct LifecycleManager<'a> {
    executor: &'a dyn Executor,
    docker: &'a DockerCli,
    options: &'a LifecycleOptions,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        docker: &'a DockerCli,
        options: &'a LifecycleOptions,
    ) -> Self {
        Self {
            executor,
            docker,
            options,
        }
    }

    /// Stop any previous instance, build and start, then check once after
    /// the settle delay.
    ///
    /// Returns the status table on success. A workload that does not come up
    /// fails with [`DeployError::ContainerStartFailure`] carrying its logs.
    pub async fn deploy(&self) -> Result<String, DeployError> {
        let mut fsm = LifecycleFsm::new();

        match self.stop().await? {
            StopOutcome::Stopped => info!("Previous instance stopped"),
            StopOutcome::NothingRunning => debug!("No previous instance to stop"),
        }

        fsm.process(LifecycleEvent::Start)
            .map_err(DeployError::Internal)?;
        info!("Building and starting the workload (this can take several minutes)...");

        let up = self.executor.run(&self.docker.up()).await?;
        if !up.success() {
            let reason = format!("build/start failed: {}", up.diagnostic());
            return Err(self.fail(&mut fsm, reason).await);
        }

        if !self.options.settle_delay.is_zero() {
            debug!("Waiting {:?} before checking status", self.options.settle_delay);
            tokio::time::sleep(self.options.settle_delay).await;
        }

        let ps = self.executor.run(&self.docker.ps()).await?;
        if !ps.success() {
            let reason = format!("status query failed: {}", ps.diagnostic());
            return Err(self.fail(&mut fsm, reason).await);
        }
        if !is_running(&ps.stdout) {
            let reason = "the container is not running after start".to_string();
            return Err(self.fail(&mut fsm, reason).await);
        }

        fsm.process(LifecycleEvent::Up).map_err(DeployError::Internal)?;
        info!("Workload is {:?}", fsm.state());
        Ok(ps.stdout)
    }

    /// Best-effort stop. Only an unexpected failure is an error.
    pub async fn stop(&self) -> Result<StopOutcome, DeployError> {
        let down = self.executor.run(&self.docker.down()).await?;
        if down.success() {
            return Ok(StopOutcome::Stopped);
        }

        let diagnostic = down.diagnostic();
        if is_nothing_to_stop(&diagnostic) {
            return Ok(StopOutcome::NothingRunning);
        }

        Err(DeployError::ContainerStartFailure {
            reason: format!("stopping the previous instance failed: {}", diagnostic),
            logs: Vec::new(),
        })
    }

    async fn fail(&self, fsm: &mut LifecycleFsm, reason: String) -> DeployError {
        if let Err(e) = fsm.process(LifecycleEvent::Fail(reason.clone())) {
            return DeployError::Internal(e);
        }

        let mut logs = match self
            .executor
            .run(&self.docker.logs(self.options.failure_log_lines))
            .await
        {
            Ok(output) => {
                let mut lines = tail_lines(&output.stdout, self.options.failure_log_lines);
                lines.extend(tail_lines(&output.stderr, self.options.failure_log_lines));
                lines
            }
            Err(e) => {
                warn!("Could not fetch workload logs: {}", e);
                Vec::new()
            }
        };
        if logs.is_empty() {
            logs.push(format!("(no log output captured) {}", reason));
        }

        DeployError::ContainerStartFailure { reason, logs }
    }
}
