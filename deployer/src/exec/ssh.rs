//! Remote execution over the ssh CLI
//!
//! Every invocation disables host-key verification and carries a bounded
//! connect timeout. Password sessions go through `sshpass -e`, which reads
//! the secret from the `SSHPASS` environment variable, so the password never
//! appears in any argument list or shell text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::errors::DeployError;
use crate::exec::process::{CommandOutput, ProcessRunner, ProcessSpec};
use crate::exec::Executor;
use crate::models::target::{ExecutionStrategy, RemoteSession};

/// ssh client options applied to every invocation
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Value for `ConnectTimeout`
    pub connect_timeout: Duration,
    /// Upper bound on the whole ssh process, if any
    pub command_timeout: Option<Duration>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: None,
        }
    }
}

/// Executes shell text on a remote host within one negotiated session
#[derive(Clone)]
pub struct SshExecutor {
    session: RemoteSession,
    options: SshOptions,
    runner: Arc<dyn ProcessRunner>,
}

impl SshExecutor {
    pub fn new(session: RemoteSession, options: SshOptions, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            session,
            options,
            runner,
        }
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    /// Build the local process that runs `remote_command` on the host
    pub fn process_spec(&self, remote_command: &str) -> ProcessSpec {
        let mut ssh_args: Vec<String> = vec![
            "-o".into(),
            "StrictHostKeyChecking=no".into(),
            "-o".into(),
            "UserKnownHostsFile=/dev/null".into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs().max(1)),
            "-p".into(),
            self.session.port().to_string(),
        ];

        let spec = match self.session.strategy() {
            ExecutionStrategy::KeyAuth => {
                // BatchMode keeps ssh from ever falling back to a password prompt
                ssh_args.extend([
                    "-o".into(),
                    "BatchMode=yes".into(),
                    "-o".into(),
                    "PasswordAuthentication=no".into(),
                ]);
                ProcessSpec::new("ssh")
            }
            ExecutionStrategy::PasswordAuth(secret) => {
                ssh_args.extend([
                    "-o".into(),
                    "PreferredAuthentications=password,keyboard-interactive".into(),
                    "-o".into(),
                    "PubkeyAuthentication=no".into(),
                    "-o".into(),
                    "NumberOfPasswordPrompts=1".into(),
                ]);
                ProcessSpec::new("sshpass")
                    .args(["-e", "ssh"])
                    .env("SSHPASS", secret.expose_secret())
            }
        };

        let spec = spec
            .args(ssh_args)
            .arg("--")
            .arg(self.session.destination())
            .arg(remote_command);

        match self.options.command_timeout {
            Some(timeout) => spec.timeout(timeout),
            None => spec,
        }
    }
}

#[async_trait]
impl Executor for SshExecutor {
    fn describe(&self) -> String {
        self.session.destination()
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError> {
        debug!("[{}] $ {}", self.session.destination(), command);
        self.runner.run(self.process_spec(command)).await
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &[u8],
    ) -> Result<CommandOutput, DeployError> {
        debug!(
            "[{}] $ {} (stdin: {} bytes)",
            self.session.destination(),
            command,
            input.len()
        );
        self.runner
            .run(self.process_spec(command).input(input))
            .await
    }
}
