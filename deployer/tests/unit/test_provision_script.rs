//! Provisioning script tests against a simulated host
//!
//! The host's tools are shell functions that record each call, so the real
//! rendered script runs unmodified under `bash` without touching the machine.

use std::path::{Path, PathBuf};
use std::process::Command;

use miner_deploy::app::options::SourceOptions;
use miner_deploy::deploy::provision::{remote_script, PROVISION_DONE};
use miner_deploy::exec::process::{CommandOutput, ProcessRunner, ProcessSpec, SystemProcess};
use miner_deploy::exec::Privilege;

/// Runtime and compose present and healthy
const READY_HOST: &str = r#"
record() { echo "$*" >> "$LOG"; }
apt-get() { record apt-get "$@"; }
curl() { record curl "$@"; }
systemctl() { record systemctl "$@"; }
docker() { record docker "$@"; }
"#;

/// git that only records, cloning an empty checkout
const FAKE_GIT: &str = r#"
git() {
    record git "$@"
    if [ "$1" = "clone" ]; then mkdir -p "$3/.git"; fi
}
"#;

/// A service manager that drains whatever is on its stdin
const GREEDY_SYSTEMCTL: &str = r#"
systemctl() { record systemctl "$@"; cat > /dev/null; }
"#;

/// Daemon never answers a version query
const DEAD_DAEMON: &str = r#"
docker() { record docker "$@"; [ "$1" != "version" ]; }
"#;

/// Remote repository unreachable
const BROKEN_GIT: &str = r#"
git() { record git "$@"; return 1; }
"#;

struct Host {
    _root: tempfile::TempDir,
    deploy_dir: PathBuf,
    log: PathBuf,
}

impl Host {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let deploy_dir = root.path().join("opt").join("btc-solo-miner");
        let log = root.path().join("calls.log");
        std::fs::write(&log, "").unwrap();
        Self {
            _root: root,
            deploy_dir,
            log,
        }
    }

    async fn provision(&self, tools: &[&str]) -> CommandOutput {
        self.provision_from("https://example.com/btc-solo-miner.git", tools)
            .await
    }

    async fn provision_from(&self, repo_url: &str, tools: &[&str]) -> CommandOutput {
        let source = SourceOptions {
            repo_url: Some(repo_url.to_string()),
            branch: "main".to_string(),
            fallback_branch: "master".to_string(),
        };
        let script = remote_script(
            Privilege::Direct,
            &self.deploy_dir.display().to_string(),
            &source,
        )
        .unwrap();

        let payload = format!("{}\n{}", tools.concat(), script);
        SystemProcess
            .run(
                ProcessSpec::new("bash")
                    .arg("-s")
                    .env("LOG", self.log.display().to_string())
                    .input(payload),
            )
            .await
            .unwrap()
    }

    /// Recorded calls starting with `prefix`
    fn calls(&self, prefix: &str) -> usize {
        std::fs::read_to_string(&self.log)
            .unwrap()
            .lines()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

#[tokio::test]
async fn test_provisioning_twice_is_idempotent() {
    let host = Host::new();

    let first = host.provision(&[READY_HOST, FAKE_GIT]).await;
    assert_eq!(first.code, Some(0), "{}", first.diagnostic());
    assert!(first.stdout.contains(PROVISION_DONE));
    assert_eq!(host.calls("git clone"), 1);
    assert_eq!(host.calls("git fetch"), 0);
    assert!(host.deploy_dir.join("logs").is_dir());

    let second = host.provision(&[READY_HOST, FAKE_GIT]).await;
    assert_eq!(second.code, Some(0), "{}", second.diagnostic());
    assert_eq!(host.calls("git clone"), 1);
    assert_eq!(host.calls("git fetch origin main"), 1);
    assert_eq!(host.calls("git reset --hard FETCH_HEAD"), 1);

    // The runtime was present both times
    assert_eq!(host.calls("apt-get"), 0);
    assert_eq!(host.calls("curl"), 0);
    assert_eq!(host.calls("docker version"), 2);
}

#[tokio::test]
async fn test_unresponsive_daemon_is_fatal() {
    let host = Host::new();

    let output = host.provision(&[READY_HOST, FAKE_GIT, DEAD_DAEMON]).await;

    assert_eq!(output.code, Some(11));
    assert!(output.stderr.contains("daemon is not responding"));
    assert_eq!(host.calls("git"), 0);
}

#[tokio::test]
async fn test_failed_clone_aborts_before_layout() {
    let host = Host::new();

    let output = host.provision(&[READY_HOST, BROKEN_GIT]).await;

    assert_eq!(output.code, Some(20));
    assert!(!host.deploy_dir.join("logs").exists());
}

#[tokio::test]
async fn test_children_cannot_consume_the_script() {
    let host = Host::new();

    let output = host
        .provision(&[READY_HOST, FAKE_GIT, GREEDY_SYSTEMCTL])
        .await;

    assert_eq!(output.code, Some(0), "{}", output.diagnostic());
    assert!(output.stdout.contains(PROVISION_DONE));
    assert_eq!(host.calls("git clone"), 1);
    assert!(host.deploy_dir.join("logs").is_dir());
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=miner",
            "-c",
            "user.email=miner@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?}", args);
}

fn commit(origin: &Path, descriptor: &str, message: &str) {
    std::fs::write(origin.join("docker-compose.yml"), descriptor).unwrap();
    git(origin, &["add", "docker-compose.yml"]);
    git(origin, &["commit", "-q", "-m", message]);
}

#[tokio::test]
async fn test_update_overrides_the_installed_descriptor() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }
    let host = Host::new();
    let upstream = tempfile::tempdir().unwrap();
    let origin = upstream.path();
    git(origin, &["init", "-q"]);
    git(origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    commit(origin, "services: {}\n", "initial");
    let repo_url = origin.display().to_string();

    let first = host.provision_from(&repo_url, &[READY_HOST]).await;
    assert_eq!(first.code, Some(0), "{}", first.diagnostic());

    // A deployment writes its own descriptor over the tracked one
    let checkout = host.deploy_dir.join("docker-compose.yml");
    std::fs::write(&checkout, "services:\n  btc-miner: {}\n").unwrap();
    commit(origin, "services:\n  btc-miner:\n    build: .\n", "build locally");

    let second = host.provision_from(&repo_url, &[READY_HOST]).await;
    assert_eq!(second.code, Some(0), "{}", second.diagnostic());
    assert_eq!(
        std::fs::read_to_string(&checkout).unwrap(),
        "services:\n  btc-miner:\n    build: .\n"
    );
    assert!(host.deploy_dir.join("logs").is_dir());
}
