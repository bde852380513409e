//! Top-level deployment run

use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::DeployOptions;
use crate::deploy::negotiate::{ConnectRequest, ConnectionNegotiator};
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::DeployError;
use crate::exec::local::LocalExecutor;
use crate::exec::process::{ProcessRunner, SystemProcess};
use crate::exec::ssh::{SshExecutor, SshOptions};
use crate::models::miner::MinerConfig;
use crate::models::result::{DeploymentResult, Stage};
use crate::models::target::DeploymentTarget;

/// Where the operator asked to deploy
#[derive(Debug, Clone)]
pub enum TargetRequest {
    Local,
    Remote(ConnectRequest),
}

/// Deploy `config` to the requested target using real processes
pub async fn run(
    target: TargetRequest,
    config: MinerConfig,
    options: &DeployOptions,
) -> DeploymentResult {
    run_with(target, config, options, Arc::new(SystemProcess)).await
}

/// Deploy with an explicit process runner
pub async fn run_with(
    target: TargetRequest,
    config: MinerConfig,
    options: &DeployOptions,
    runner: Arc<dyn ProcessRunner>,
) -> DeploymentResult {
    match target {
        TargetRequest::Local => {
            let executor = LocalExecutor::new(runner);
            Orchestrator::new(&executor, DeploymentTarget::Local, options)
                .run(config)
                .await
        }
        TargetRequest::Remote(request) => {
            // Checked before connecting, so a doomed run never touches the host
            if options.source.repo_url.is_none() {
                let e = DeployError::ValidationFailure(
                    "A source repository URL is required for remote deployments (pass --repo-url or set repo_url)"
                        .to_string(),
                );
                error!("{}", e);
                return DeploymentResult::begin(Stage::Connect).fail(e);
            }

            info!("Connecting to {}@{}:{}", request.user, request.host, request.port);
            let negotiator = ConnectionNegotiator::new(runner.clone(), options.ssh.probe_timeout);
            let session = match negotiator.negotiate(request).await {
                Ok(session) => session,
                Err(e) => {
                    error!("Connection failed: {}", e);
                    return DeploymentResult::begin(Stage::Connect).fail(e);
                }
            };

            let target = session.target();
            let executor = SshExecutor::new(
                session,
                SshOptions {
                    connect_timeout: options.ssh.connect_timeout,
                    command_timeout: None,
                },
                runner,
            );
            Orchestrator::new(&executor, target, options).run(config).await
        }
    }
}
