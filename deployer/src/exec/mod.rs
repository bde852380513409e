//! Command execution against a deployment target
//!
//! Every stage talks to its target through the [`Executor`] trait. The local
//! implementation runs `bash` on this machine; the ssh implementation runs
//! the same shell text on a remote host under the session's frozen
//! authentication strategy.

pub mod local;
pub mod process;
pub mod ssh;
pub mod template;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::exec::process::CommandOutput;

/// How commands that need elevated rights are issued on a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Privilege {
    /// The executing user can talk to the runtime directly
    #[default]
    Direct,
    /// Commands are prefixed with non-interactive sudo
    Sudo,
}

impl Privilege {
    /// Shell prefix for privileged commands, including the trailing space
    pub fn prefix(&self) -> &'static str {
        match self {
            Privilege::Direct => "",
            Privilege::Sudo => "sudo -n ",
        }
    }
}

/// Runs shell text on a target
#[async_trait]
pub trait Executor: Send + Sync {
    /// Human readable description of the target, for logs and summaries
    fn describe(&self) -> String;

    /// Run one shell command line.
    ///
    /// Non-zero exits are returned in the output, never retried.
    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError>;

    /// Run one shell command line with `input` on its stdin
    async fn run_with_input(
        &self,
        command: &str,
        input: &[u8],
    ) -> Result<CommandOutput, DeployError>;

    /// Run a multi-line script as one shell session, so `cd` and exit
    /// policies inside it apply to the whole body.
    async fn run_script(&self, script: &str) -> Result<CommandOutput, DeployError> {
        self.run_with_input("bash -s", script.as_bytes()).await
    }
}
