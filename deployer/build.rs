//! Version stamp for `miner-deploy --version`

use std::process::Command;

use chrono::Utc;

/// Set when building from a source archive without git metadata
const HASH_OVERRIDE: &str = "MINER_DEPLOY_GIT_HASH";

fn git_hash() -> Option<String> {
    if let Ok(hash) = std::env::var(HASH_OVERRIDE) {
        return Some(hash.trim().to_string()).filter(|h| !h.is_empty());
    }

    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    let git_hash = git_hash().unwrap_or_else(|| "unknown".to_string());
    let build_time = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-env-changed={}", HASH_OVERRIDE);
    // the repository root is one level above this crate
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
