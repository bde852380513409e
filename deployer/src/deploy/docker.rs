//! Container runtime command lines

use crate::exec::template::shell_quote;
use crate::exec::Privilege;

/// Which compose implementation a target provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTool {
    /// `docker compose` (v2 plugin)
    Plugin,
    /// `docker-compose` (standalone v1 binary)
    Standalone,
}

impl ComposeTool {
    fn program(&self) -> &'static str {
        match self {
            ComposeTool::Plugin => "docker compose",
            ComposeTool::Standalone => "docker-compose",
        }
    }
}

/// Builds runtime and compose command lines for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerCli {
    privilege: Privilege,
    compose: ComposeTool,
    project_dir: String,
}

impl DockerCli {
    pub fn new(privilege: Privilege, compose: ComposeTool, project_dir: impl Into<String>) -> Self {
        Self {
            privilege,
            compose,
            project_dir: project_dir.into(),
        }
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn project_dir(&self) -> &str {
        &self.project_dir
    }

    /// `compose <args>` run from the project directory
    pub fn compose(&self, args: &str) -> String {
        format!(
            "cd {} && {}{} {}",
            shell_quote(&self.project_dir),
            self.privilege.prefix(),
            self.compose.program(),
            args
        )
    }

    /// Stop and remove the workload's containers
    pub fn down(&self) -> String {
        self.compose("down --remove-orphans")
    }

    /// Build the image and start detached, never prompting
    pub fn up(&self) -> String {
        self.compose("up -d --build --no-color")
    }

    /// Process status table
    pub fn ps(&self) -> String {
        self.compose("ps")
    }

    /// Last `lines` lines of workload output
    pub fn logs(&self, lines: usize) -> String {
        self.compose(&format!("logs --no-color --tail {}", lines))
    }

    /// Follow-up commands printed to the operator
    pub fn logs_follow(&self) -> String {
        self.compose("logs -f")
    }

    pub fn restart(&self) -> String {
        self.compose("restart")
    }
}
