//! Deployment targets and session authentication

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Where the workload runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentTarget {
    /// The operator's own machine
    Local,
    /// A Linux host reached over ssh
    Remote { host: String, user: String },
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentTarget::Local => write!(f, "local machine"),
            DeploymentTarget::Remote { host, user } => write!(f, "{}@{}", user, host),
        }
    }
}

/// Deployment mode chosen by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    Local,
    #[default]
    Remote,
}

/// Authentication the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Use the ssh agent / key files already configured on this machine
    #[default]
    Key,
    /// Use a password piped through sshpass
    Password,
}

/// Authentication strategy frozen for the whole session
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    /// Ambient key material; nothing is stored
    KeyAuth,
    /// Password held in memory for the session only
    PasswordAuth(SecretString),
}

impl ExecutionStrategy {
    pub fn mode(&self) -> AuthMode {
        match self {
            ExecutionStrategy::KeyAuth => AuthMode::Key,
            ExecutionStrategy::PasswordAuth(_) => AuthMode::Password,
        }
    }
}

impl PartialEq for ExecutionStrategy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExecutionStrategy::KeyAuth, ExecutionStrategy::KeyAuth) => true,
            (ExecutionStrategy::PasswordAuth(a), ExecutionStrategy::PasswordAuth(b)) => {
                a.expose_secret() == b.expose_secret()
            }
            _ => false,
        }
    }
}

impl Eq for ExecutionStrategy {}

/// An authenticated remote session.
///
/// Produced once by connection negotiation and then passed by reference to
/// every remote step. It has no setters: the strategy cannot change after
/// negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    host: String,
    user: String,
    port: u16,
    strategy: ExecutionStrategy,
}

impl RemoteSession {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        port: u16,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port,
            strategy,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    /// `user@host` destination for ssh
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Remote {
            host: self.host.clone(),
            user: self.user.clone(),
        }
    }
}
