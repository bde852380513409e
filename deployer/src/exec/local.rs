//! Executor for the operator's own machine

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::exec::process::{CommandOutput, ProcessRunner, ProcessSpec, SystemProcess};
use crate::exec::Executor;

/// Runs shell text through the local `bash`
#[derive(Clone)]
pub struct LocalExecutor {
    runner: Arc<dyn ProcessRunner>,
}

impl LocalExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Local executor spawning real processes
    pub fn system() -> Self {
        Self::new(Arc::new(SystemProcess))
    }

    /// The process runner backing this executor
    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        self.runner.clone()
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn describe(&self) -> String {
        "localhost".to_string()
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError> {
        self.runner
            .run(ProcessSpec::new("bash").args(["-c", command]))
            .await
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &[u8],
    ) -> Result<CommandOutput, DeployError> {
        self.runner
            .run(ProcessSpec::new("bash").args(["-c", command]).input(input))
            .await
    }
}
