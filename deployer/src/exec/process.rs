//! Local process spawning

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::DeployError;

/// A fully described process invocation
#[derive(Clone, Default)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables. Values may be secrets and are never logged.
    pub env: Vec<(String, String)>,
    /// Bytes written to the child's stdin, which is closed afterwards
    pub input: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ProcessSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .field("input_len", &self.input.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Builds a successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Builds a failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stderr if present, otherwise stdout, trimmed
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Spawns processes on the operator's machine
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the process to completion.
    ///
    /// A non-zero exit is not an error here; it is reported in the output.
    async fn run(&self, spec: ProcessSpec) -> Result<CommandOutput, DeployError>;

    /// Whether `program` can be found on the search path
    async fn is_available(&self, program: &str) -> bool;
}

/// Process runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

#[async_trait]
impl ProcessRunner for SystemProcess {
    async fn run(&self, spec: ProcessSpec) -> Result<CommandOutput, DeployError> {
        debug!("Spawning process: {:?}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(if spec.input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DeployError::MissingLocalTool(spec.program.clone()),
            _ => DeployError::IoError(e),
        })?;

        // stdin is fed while stdout/stderr drain, all under the timeout
        let stdin = child.stdin.take();
        let input = spec.input.as_deref();
        let feed = async move {
            let (Some(mut stdin), Some(input)) = (stdin, input) else {
                return Ok(());
            };
            stdin.write_all(input).await?;
            stdin.shutdown().await
        };
        let exchange = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output?;
            match fed {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                // BrokenPipe: the child exited without reading all of its input
                _ => Ok(output),
            }
        };

        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| DeployError::CommandTimeout {
                    program: spec.program.clone(),
                    after: limit,
                })??,
            None => exchange.await?,
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn is_available(&self, program: &str) -> bool {
        Command::new("sh")
            .args(["-c", "command -v \"$1\"", "sh", program])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
