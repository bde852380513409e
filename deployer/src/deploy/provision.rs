//! Target provisioning
//!
//! Remote targets get one atomic script that installs the runtime when
//! missing, syncs the source tree and lays out the deployment directory.
//! Every step checks before acting, so running it again changes nothing.
//! Local targets are only checked: the operator's machine is never modified
//! beyond creating the logs directory.

use std::path::Path;

use tracing::{debug, info};

use crate::app::options::SourceOptions;
use crate::deploy::docker::{ComposeTool, DockerCli};
use crate::errors::DeployError;
use crate::exec::template::ScriptTemplate;
use crate::exec::{Executor, Privilege};
use crate::filesys::dir::Dir;
use crate::models::target::DeploymentTarget;

/// Script exit codes, one per failing sub-step
const EXIT_RUNTIME_INSTALL: i32 = 10;
const EXIT_RUNTIME_UNRESPONSIVE: i32 = 11;
const EXIT_SOURCE_SYNC: i32 = 20;
const EXIT_LAYOUT: i32 = 30;

/// ssh reports connection loss with this code
const EXIT_SSH_FAILURE: i32 = 255;

/// Last line the script prints; its absence means the run was cut short
pub const PROVISION_DONE: &str = "[provision] done";

const REMOTE_PROVISION_SCRIPT: &str = r#"set -u
export DEBIAN_FRONTEND=noninteractive
SUDO={{sudo}}
DEPLOY_DIR={{deploy_dir}}
REPO_URL={{repo_url}}
BRANCH={{branch}}
FALLBACK_BRANCH={{fallback_branch}}

fail() {
    echo "$2" >&2
    exit "$1"
}

apt() {
    $SUDO env DEBIAN_FRONTEND=noninteractive apt-get "$@"
}

sync_branch() {
    $SUDO git fetch origin "$1" && $SUDO git reset --hard FETCH_HEAD
}

provision() {
    # container runtime
    if ! command -v docker >/dev/null 2>&1; then
        echo "[provision] installing container runtime"
        apt update -y >/dev/null || fail 10 "package index update failed"
        apt install -y ca-certificates curl git >/dev/null || fail 10 "supporting package install failed"
        curl -fsSL https://get.docker.com -o /tmp/get-docker.sh || fail 10 "runtime installer download failed"
        $SUDO sh /tmp/get-docker.sh >/dev/null || fail 10 "runtime install failed"
    fi
    if ! command -v git >/dev/null 2>&1; then
        echo "[provision] installing git"
        apt install -y git >/dev/null || fail 10 "git install failed"
    fi
    if ! $SUDO docker compose version >/dev/null 2>&1 && ! command -v docker-compose >/dev/null 2>&1; then
        echo "[provision] installing compose"
        apt install -y docker-compose-plugin >/dev/null 2>&1 \
            || apt install -y docker-compose >/dev/null \
            || fail 10 "compose install failed"
    fi
    if command -v systemctl >/dev/null 2>&1; then
        $SUDO systemctl enable docker >/dev/null 2>&1 || true
        $SUDO systemctl start docker || fail 10 "runtime service failed to start"
    fi
    $SUDO docker version >/dev/null 2>&1 || fail 11 "runtime installed but the daemon is not responding"

    # source tree, reset to the remote branch so local edits never block an update
    if [ -d "$DEPLOY_DIR/.git" ]; then
        echo "[provision] updating source in $DEPLOY_DIR"
        cd "$DEPLOY_DIR" || fail 20 "cannot enter $DEPLOY_DIR"
        sync_branch "$BRANCH" || sync_branch "$FALLBACK_BRANCH" \
            || fail 20 "git fetch failed for $BRANCH and $FALLBACK_BRANCH"
    else
        echo "[provision] cloning source into $DEPLOY_DIR"
        $SUDO mkdir -p "$(dirname "$DEPLOY_DIR")" || fail 20 "cannot create parent of $DEPLOY_DIR"
        $SUDO git clone "$REPO_URL" "$DEPLOY_DIR" || fail 20 "git clone failed"
    fi

    # layout
    $SUDO mkdir -p "$DEPLOY_DIR/logs" || fail 30 "cannot create $DEPLOY_DIR/logs"
    echo "[provision] done"
}

# the script itself arrives on stdin; keep every child off it
provision </dev/null
"#;

/// Render the remote provisioning script
pub fn remote_script(
    privilege: Privilege,
    deploy_dir: &str,
    source: &SourceOptions,
) -> Result<String, DeployError> {
    let repo_url = source.repo_url.as_deref().ok_or_else(|| {
        DeployError::ValidationFailure(
            "A source repository URL is required for remote deployments".to_string(),
        )
    })?;

    ScriptTemplate::new(REMOTE_PROVISION_SCRIPT)
        .bind("sudo", privilege.prefix().trim_end())
        .bind("deploy_dir", deploy_dir)
        .bind("repo_url", repo_url)
        .bind("branch", &source.branch)
        .bind("fallback_branch", &source.fallback_branch)
        .render()
}

/// Privilege needed on a remote host for the given login user
pub fn remote_privilege(user: &str) -> Privilege {
    if user == "root" {
        Privilege::Direct
    } else {
        Privilege::Sudo
    }
}

/// Makes a target ready to build and run the workload
pub struct ProvisioningPipeline<'a> {
    executor: &'a dyn Executor,
    source: &'a SourceOptions,
}

impl<'a> ProvisioningPipeline<'a> {
    pub fn new(executor: &'a dyn Executor, source: &'a SourceOptions) -> Self {
        Self { executor, source }
    }

    /// Provision `target` with `deploy_dir` as deployment root.
    ///
    /// Returns the runtime command builder to use for the rest of the run.
    pub async fn provision(
        &self,
        target: &DeploymentTarget,
        deploy_dir: &str,
    ) -> Result<DockerCli, DeployError> {
        match target {
            DeploymentTarget::Remote { user, .. } => {
                self.provision_remote(remote_privilege(user), deploy_dir).await
            }
            DeploymentTarget::Local => self.provision_local(Path::new(deploy_dir)).await,
        }
    }

    async fn provision_remote(
        &self,
        privilege: Privilege,
        deploy_dir: &str,
    ) -> Result<DockerCli, DeployError> {
        let script = remote_script(privilege, deploy_dir, self.source)?;
        info!("Provisioning {} (runtime, source, layout)...", self.executor.describe());

        let output = self.executor.run_script(&script).await?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{}", line);
        }

        match output.code {
            Some(0) if output.stdout.contains(PROVISION_DONE) => {}
            Some(0) => {
                return Err(DeployError::RuntimeInstallFailure(format!(
                    "provisioning script ended early without completing: {}",
                    output.diagnostic()
                )));
            }
            Some(EXIT_RUNTIME_INSTALL) | Some(EXIT_RUNTIME_UNRESPONSIVE) => {
                return Err(DeployError::RuntimeInstallFailure(output.diagnostic()));
            }
            Some(EXIT_SOURCE_SYNC) => {
                return Err(DeployError::SourceSyncFailure(output.diagnostic()));
            }
            Some(EXIT_LAYOUT) => {
                return Err(DeployError::SourceSyncFailure(format!(
                    "deployment layout: {}",
                    output.diagnostic()
                )));
            }
            Some(EXIT_SSH_FAILURE) => {
                return Err(DeployError::ConnectivityFailure(format!(
                    "lost connection during provisioning: {}",
                    output.diagnostic()
                )));
            }
            code => {
                return Err(DeployError::RuntimeInstallFailure(format!(
                    "provisioning script exited with {:?}: {}",
                    code,
                    output.diagnostic()
                )));
            }
        }

        let compose = detect_compose(self.executor, privilege)
            .await?
            .ok_or_else(|| {
                DeployError::RuntimeInstallFailure("compose tool missing after install".to_string())
            })?;

        info!("Target provisioned, using {:?} compose", compose);
        Ok(DockerCli::new(privilege, compose, deploy_dir))
    }

    async fn provision_local(&self, deploy_dir: &Path) -> Result<DockerCli, DeployError> {
        info!("Checking local container runtime...");

        if !self.executor.run("command -v docker").await?.success() {
            return Err(DeployError::MissingLocalTool("docker".to_string()));
        }

        let privilege = detect_local_privilege(self.executor).await?;
        let compose = detect_compose(self.executor, privilege)
            .await?
            .ok_or_else(|| {
                DeployError::MissingLocalTool("docker compose or docker-compose".to_string())
            })?;

        let root = Dir::new(deploy_dir);
        if !root.file("Dockerfile").exists().await {
            return Err(DeployError::SourceSyncFailure(format!(
                "no Dockerfile in {}; run from the miner source tree or set local_dir",
                deploy_dir.display()
            )));
        }

        root.subdir("logs").create().await.map_err(|e| {
            DeployError::SourceSyncFailure(format!("cannot create logs directory: {}", e))
        })?;

        info!("Local runtime ready ({:?}, {:?} compose)", privilege, compose);
        Ok(DockerCli::new(privilege, compose, deploy_dir.display().to_string()))
    }
}

/// Decide how the local user reaches the runtime daemon
async fn detect_local_privilege(executor: &dyn Executor) -> Result<Privilege, DeployError> {
    let direct = executor.run("docker info").await?;
    if direct.success() {
        return Ok(Privilege::Direct);
    }
    debug!("docker info without sudo failed: {}", direct.diagnostic());

    let elevated = executor.run("sudo -n docker info").await?;
    if elevated.success() {
        return Ok(Privilege::Sudo);
    }

    Err(DeployError::RuntimeInstallFailure(format!(
        "the container runtime is installed but not reachable (start it, or allow this user to use it): {}",
        direct.diagnostic()
    )))
}

/// Find the compose flavour available with `privilege`
async fn detect_compose(
    executor: &dyn Executor,
    privilege: Privilege,
) -> Result<Option<ComposeTool>, DeployError> {
    let plugin = format!("{}docker compose version", privilege.prefix());
    if executor.run(&plugin).await?.success() {
        return Ok(Some(ComposeTool::Plugin));
    }
    if executor.run("command -v docker-compose").await?.success() {
        return Ok(Some(ComposeTool::Standalone));
    }
    Ok(None)
}
