//! Deployment orchestration
//!
//! Drives one run through provisioning, configuration, start and report.
//! Stages run strictly in order and the first failure ends the run; nothing
//! already done is rolled back.

use chrono::Utc;
use tracing::{error, info};

use crate::app::options::DeployOptions;
use crate::deploy::compose::{install_descriptor, ConfigRenderer};
use crate::deploy::docker::DockerCli;
use crate::deploy::lifecycle::LifecycleManager;
use crate::deploy::provision::ProvisioningPipeline;
use crate::deploy::status::StatusReporter;
use crate::errors::DeployError;
use crate::exec::template::shell_quote;
use crate::exec::Executor;
use crate::models::miner::MinerConfig;
use crate::models::result::{DeploymentResult, FollowUp, Stage};
use crate::models::target::DeploymentTarget;

pub struct Orchestrator<'a> {
    executor: &'a dyn Executor,
    target: DeploymentTarget,
    options: &'a DeployOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(executor: &'a dyn Executor, target: DeploymentTarget, options: &'a DeployOptions) -> Self {
        Self {
            executor,
            target,
            options,
        }
    }

    /// Run every stage once and record how far the run got
    pub async fn run(&self, config: MinerConfig) -> DeploymentResult {
        let mut result = DeploymentResult::begin(Stage::Provision);

        info!("Deploying to {} via {}", self.target, self.executor.describe());
        match self.execute(config, &mut result).await {
            Ok(()) => {
                result.stage = Stage::Done;
                info!("Deployment finished");
            }
            Err(e) => {
                error!(stage = %result.stage, "Deployment failed: {}", e);
                result.error = Some(e);
            }
        }

        result.finished_at = Utc::now();
        result
    }

    async fn execute(
        &self,
        config: MinerConfig,
        result: &mut DeploymentResult,
    ) -> Result<(), DeployError> {
        let config = match self.target {
            DeploymentTarget::Remote { .. } => config.with_quiet_mode(false),
            DeploymentTarget::Local => config,
        };
        let deploy_dir = self.deploy_dir()?;

        result.stage = Stage::Provision;
        let docker = ProvisioningPipeline::new(self.executor, &self.options.source)
            .provision(&self.target, &deploy_dir)
            .await?;

        result.stage = Stage::Configure;
        let descriptor = ConfigRenderer::new(self.options.compose.clone()).render(&config);
        install_descriptor(self.executor, docker.privilege(), docker.project_dir(), &descriptor)
            .await?;

        result.stage = Stage::Start;
        LifecycleManager::new(self.executor, &docker, &self.options.lifecycle)
            .deploy()
            .await?;

        result.stage = Stage::Report;
        let snapshot = StatusReporter::new(self.executor, &docker, self.options.status_tail_lines)
            .report()
            .await;
        result.snapshot = Some(snapshot);
        result.follow_up = self.follow_up(&docker);

        Ok(())
    }

    fn deploy_dir(&self) -> Result<String, DeployError> {
        match self.target {
            DeploymentTarget::Remote { .. } => Ok(self.options.remote_dir.clone()),
            DeploymentTarget::Local => {
                let dir = std::path::absolute(&self.options.local_dir)?;
                Ok(dir.display().to_string())
            }
        }
    }

    /// How to view logs, stop and restart the workload afterwards
    fn follow_up(&self, docker: &DockerCli) -> Vec<FollowUp> {
        [
            ("View logs", docker.logs_follow()),
            ("Stop", docker.down()),
            ("Restart", docker.restart()),
        ]
        .into_iter()
        .map(|(purpose, command)| FollowUp {
            purpose,
            command: self.on_target(command),
        })
        .collect()
    }

    fn on_target(&self, command: String) -> String {
        match &self.target {
            DeploymentTarget::Local => command,
            DeploymentTarget::Remote { host, user } => format!(
                "ssh -t -p {} {}@{} {}",
                self.options.ssh.port,
                user,
                host,
                shell_quote(&command)
            ),
        }
    }
}
