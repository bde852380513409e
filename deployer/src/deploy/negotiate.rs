//! Connection negotiation for remote targets
//!
//! A single no-op probe decides whether the requested authentication works.
//! The resulting session is frozen; later stages never re-test or switch
//! strategies.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::exec::process::ProcessRunner;
use crate::exec::ssh::{SshExecutor, SshOptions};
use crate::exec::Executor;
use crate::models::target::{AuthMode, ExecutionStrategy, RemoteSession};

/// sshpass exit code for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// ssh exit code for connection or authentication errors
const SSH_CONNECTION_ERROR: i32 = 255;

/// What the operator asked to connect with
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub auth: AuthMode,
    pub password: Option<SecretString>,
}

/// Probes a remote host once and freezes the execution strategy
pub struct ConnectionNegotiator {
    runner: Arc<dyn ProcessRunner>,
    probe_timeout: Duration,
}

impl ConnectionNegotiator {
    pub fn new(runner: Arc<dyn ProcessRunner>, probe_timeout: Duration) -> Self {
        Self {
            runner,
            probe_timeout,
        }
    }

    /// Validate tooling, probe the host and return the frozen session
    pub async fn negotiate(&self, request: ConnectRequest) -> Result<RemoteSession, DeployError> {
        if request.host.trim().is_empty() {
            return Err(DeployError::ValidationFailure("Remote host must not be empty".to_string()));
        }
        if request.user.trim().is_empty() {
            return Err(DeployError::ValidationFailure("Remote user must not be empty".to_string()));
        }

        if !self.runner.is_available("ssh").await {
            return Err(DeployError::MissingLocalTool("ssh".to_string()));
        }

        let strategy = match request.auth {
            AuthMode::Key => ExecutionStrategy::KeyAuth,
            AuthMode::Password => {
                let password = request
                    .password
                    .filter(|p| !p.expose_secret().is_empty())
                    .ok_or_else(|| {
                        DeployError::ValidationFailure(
                            "Password authentication requires a password".to_string(),
                        )
                    })?;
                if !self.runner.is_available("sshpass").await {
                    return Err(DeployError::MissingLocalTool(
                        "sshpass (required for password authentication)".to_string(),
                    ));
                }
                ExecutionStrategy::PasswordAuth(password)
            }
        };

        let session = RemoteSession::new(
            request.host.trim(),
            request.user.trim(),
            request.port,
            strategy,
        );
        info!(
            "Testing {:?} authentication to {}...",
            session.strategy().mode(),
            session.destination()
        );

        let probe = SshExecutor::new(
            session.clone(),
            SshOptions {
                connect_timeout: self.probe_timeout,
                command_timeout: Some(self.probe_timeout * 3),
            },
            self.runner.clone(),
        );

        match probe.run("true").await {
            Ok(output) if output.success() => {
                info!("Connection to {} established", session.destination());
                Ok(session)
            }
            Ok(output) => {
                debug!("Probe failed: {:?}", output);
                let reason = match (session.strategy(), output.code) {
                    (ExecutionStrategy::PasswordAuth(_), Some(SSHPASS_BAD_PASSWORD)) => {
                        "password rejected".to_string()
                    }
                    (_, Some(SSH_CONNECTION_ERROR)) => {
                        let detail = output.diagnostic();
                        if detail.is_empty() {
                            "host unreachable or authentication refused".to_string()
                        } else {
                            detail
                        }
                    }
                    _ => format!("probe exited with {:?}: {}", output.code, output.diagnostic()),
                };
                Err(DeployError::ConnectivityFailure(format!(
                    "Cannot connect to {}: {}",
                    session.destination(),
                    reason
                )))
            }
            Err(DeployError::MissingLocalTool(tool)) => Err(DeployError::MissingLocalTool(tool)),
            Err(e) => Err(DeployError::ConnectivityFailure(format!(
                "Cannot connect to {}: {}",
                session.destination(),
                e
            ))),
        }
    }
}
