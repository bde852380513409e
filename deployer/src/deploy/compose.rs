//! Compose descriptor rendering and installation
//!
//! The descriptor is rebuilt from the miner config on every deployment and
//! replaces whatever file is on the target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::options::ComposeOptions;
use crate::errors::DeployError;
use crate::exec::template::shell_quote;
use crate::exec::{Executor, Privilege};
use crate::models::miner::{is_numeric_id, MinerConfig};

/// File name of the descriptor inside the deployment root
pub const COMPOSE_FILE: &str = "docker-compose.yml";

pub const ENV_BTC_ADDRESS: &str = "BTC_ADDRESS";
pub const ENV_QUIET_MODE: &str = "QUIET_MODE";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";
pub const ENV_CONTAINER_MARKER: &str = "DOCKER_CONTAINER";
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_USER_ID: &str = "TELEGRAM_USER_ID";

/// Host logs directory and its mount point inside the container
const LOGS_VOLUME: &str = "./logs:/app/logs";

/// Top-level compose document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDescriptor {
    pub services: BTreeMap<String, ServiceSpec>,
}

/// The single workload service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub build: String,
    pub container_name: String,
    pub restart: String,
    /// `KEY=value` entries, in a fixed order
    pub environment: Vec<String>,
    pub volumes: Vec<String>,
    pub stdin_open: bool,
    pub tty: bool,
    pub logging: LoggingSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSpec {
    pub driver: String,
    pub options: LoggingRotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingRotation {
    #[serde(rename = "max-size")]
    pub max_size: String,
    #[serde(rename = "max-file")]
    pub max_file: String,
    pub labels: String,
}

impl ComposeDescriptor {
    /// The workload service, when present
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> Result<String, DeployError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl ServiceSpec {
    /// Value of an environment entry
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment.iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }

    /// Environment keys in declaration order
    pub fn env_keys(&self) -> Vec<&str> {
        self.environment
            .iter()
            .filter_map(|entry| entry.split_once('=').map(|(k, _)| k))
            .collect()
    }
}

/// Builds compose descriptors. Pure: no I/O.
#[derive(Debug, Clone, Default)]
pub struct ConfigRenderer {
    options: ComposeOptions,
}

impl ConfigRenderer {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, config: &MinerConfig) -> ComposeDescriptor {
        let mut environment = vec![
            format!("{}={}", ENV_BTC_ADDRESS, config.btc_address()),
            format!("{}={}", ENV_QUIET_MODE, if config.quiet_mode() { 1 } else { 0 }),
            format!("{}=info", ENV_LOG_LEVEL),
            format!("{}=1", ENV_CONTAINER_MARKER),
        ];

        // Checked again here so a hand-built config cannot emit half a pair
        if let Some(telegram) = config.telegram() {
            if !telegram.token.is_empty() && is_numeric_id(&telegram.user_id) {
                environment.push(format!("{}={}", ENV_TELEGRAM_TOKEN, telegram.token));
                environment.push(format!("{}={}", ENV_TELEGRAM_USER_ID, telegram.user_id));
            }
        }

        let service = ServiceSpec {
            build: ".".to_string(),
            container_name: self.options.container_name.clone(),
            restart: "always".to_string(),
            environment,
            volumes: vec![LOGS_VOLUME.to_string()],
            stdin_open: false,
            tty: false,
            logging: LoggingSpec {
                driver: "json-file".to_string(),
                options: LoggingRotation {
                    max_size: "10m".to_string(),
                    max_file: "3".to_string(),
                    labels: self.options.service_name.clone(),
                },
            },
        };

        let mut services = BTreeMap::new();
        services.insert(self.options.service_name.clone(), service);
        ComposeDescriptor { services }
    }
}

/// Path of the descriptor inside `deploy_dir`
pub fn descriptor_path(deploy_dir: &str) -> String {
    format!("{}/{}", deploy_dir.trim_end_matches('/'), COMPOSE_FILE)
}

/// Write the descriptor to the target, replacing any existing file, then
/// read it back and compare.
pub async fn install_descriptor(
    executor: &dyn Executor,
    privilege: Privilege,
    deploy_dir: &str,
    descriptor: &ComposeDescriptor,
) -> Result<String, DeployError> {
    let path = descriptor_path(deploy_dir);
    let yaml = descriptor.to_yaml()?;
    info!("Writing {} on {}", path, executor.describe());

    let write = format!("{}tee {} > /dev/null", privilege.prefix(), shell_quote(&path));
    let output = executor
        .run_with_input(&write, yaml.as_bytes())
        .await
        .map_err(|e| DeployError::ConfigWriteFailure(format!("{}: {}", path, e)))?;
    if !output.success() {
        return Err(DeployError::ConfigWriteFailure(format!(
            "{}: {}",
            path,
            output.diagnostic()
        )));
    }

    let read = format!("{}cat {}", privilege.prefix(), shell_quote(&path));
    let output = executor
        .run(&read)
        .await
        .map_err(|e| DeployError::ConfigWriteFailure(format!("{}: {}", path, e)))?;
    if !output.success() {
        return Err(DeployError::ConfigWriteFailure(format!(
            "{} missing after write: {}",
            path,
            output.diagnostic()
        )));
    }
    if output.stdout != yaml {
        return Err(DeployError::ConfigWriteFailure(format!(
            "{} does not match what was written",
            path
        )));
    }

    debug!("Verified {} ({} bytes)", path, yaml.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::process::CommandOutput;
    use crate::exec::testing::ScriptedExecutor;
    use crate::models::miner::TelegramConfig;

    const ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn service(descriptor: &ComposeDescriptor) -> &ServiceSpec {
        descriptor.service("btc-miner").unwrap()
    }

    #[test]
    fn test_base_environment_only() {
        let config = MinerConfig::new(ADDRESS, "", "").unwrap();
        let descriptor = ConfigRenderer::default().render(&config);
        let service = service(&descriptor);

        assert_eq!(
            service.env_keys(),
            vec![ENV_BTC_ADDRESS, ENV_QUIET_MODE, ENV_LOG_LEVEL, ENV_CONTAINER_MARKER]
        );
        assert_eq!(service.env(ENV_BTC_ADDRESS), Some(ADDRESS));
        assert_eq!(service.env(ENV_QUIET_MODE), Some("0"));
        assert_eq!(service.env(ENV_LOG_LEVEL), Some("info"));
        assert_eq!(service.env(ENV_CONTAINER_MARKER), Some("1"));
    }

    #[test]
    fn test_telegram_pair_included() {
        let config = MinerConfig::new(ADDRESS, "123:tok", "987654").unwrap();
        let descriptor = ConfigRenderer::default().render(&config);
        let service = service(&descriptor);

        assert_eq!(service.environment.len(), 6);
        assert_eq!(service.env(ENV_TELEGRAM_TOKEN), Some("123:tok"));
        assert_eq!(service.env(ENV_TELEGRAM_USER_ID), Some("987654"));
    }

    #[test]
    fn test_token_without_id_degrades() {
        let config = MinerConfig::new(ADDRESS, "123:tok", "").unwrap();
        let yaml = ConfigRenderer::default().render(&config).to_yaml().unwrap();
        assert!(!yaml.contains("TELEGRAM"));
    }

    #[test]
    fn test_render_rechecks_telegram() {
        let mut value = serde_json::to_value(MinerConfig::new(ADDRESS, "", "").unwrap()).unwrap();
        value["telegram"] = serde_json::to_value(TelegramConfig {
            token: "123:tok".to_string(),
            user_id: String::new(),
        })
        .unwrap();
        let config: MinerConfig = serde_json::from_value(value).unwrap();

        let descriptor = ConfigRenderer::default().render(&config);
        assert_eq!(service(&descriptor).environment.len(), 4);
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = MinerConfig::new(ADDRESS, "123:tok", "42").unwrap();
        let renderer = ConfigRenderer::default();
        let first = renderer.render(&config).to_yaml().unwrap();
        let second = renderer.render(&config).to_yaml().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_descriptor_schema() {
        let config = MinerConfig::new(ADDRESS, "", "").unwrap().with_quiet_mode(true);
        let yaml = ConfigRenderer::default().render(&config).to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let svc = &doc["services"]["btc-miner"];

        assert_eq!(svc["build"], ".");
        assert_eq!(svc["container_name"], "btc-solo-miner");
        assert_eq!(svc["restart"], "always");
        assert_eq!(svc["volumes"][0], "./logs:/app/logs");
        assert_eq!(svc["stdin_open"], false);
        assert_eq!(svc["tty"], false);
        assert_eq!(svc["logging"]["driver"], "json-file");
        assert_eq!(svc["logging"]["options"]["max-size"], "10m");
        assert_eq!(svc["logging"]["options"]["max-file"], "3");
        assert_eq!(svc["environment"][1], "QUIET_MODE=1");
    }

    #[test]
    fn test_quotes_survive_yaml() {
        let config = MinerConfig::new("1Ab'c\"d: #x", "", "").unwrap();
        let descriptor = ConfigRenderer::default().render(&config);
        let yaml = descriptor.to_yaml().unwrap();
        let parsed: ComposeDescriptor = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[tokio::test]
    async fn test_install_writes_and_verifies() {
        let config = MinerConfig::new(ADDRESS, "", "").unwrap();
        let descriptor = ConfigRenderer::default().render(&config);
        let yaml = descriptor.to_yaml().unwrap();
        let executor = ScriptedExecutor::new().on("cat ", CommandOutput::ok(yaml.clone()));

        let path = install_descriptor(&executor, Privilege::Sudo, "/opt/btc-solo-miner/", &descriptor)
            .await
            .unwrap();

        assert_eq!(path, "/opt/btc-solo-miner/docker-compose.yml");
        let calls = executor.calls();
        assert_eq!(calls[0], "sudo -n tee /opt/btc-solo-miner/docker-compose.yml > /dev/null");
        assert_eq!(calls[1], "sudo -n cat /opt/btc-solo-miner/docker-compose.yml");
        assert_eq!(executor.inputs.lock().unwrap()[0], yaml);
    }

    #[tokio::test]
    async fn test_install_detects_missing_file() {
        let descriptor = ConfigRenderer::default().render(&MinerConfig::new(ADDRESS, "", "").unwrap());
        let executor = ScriptedExecutor::new()
            .on("cat ", CommandOutput::failed(1, "No such file or directory"));

        let result = install_descriptor(&executor, Privilege::Direct, "/opt/m", &descriptor).await;
        assert!(matches!(result, Err(DeployError::ConfigWriteFailure(_))));
    }

    #[tokio::test]
    async fn test_install_detects_mismatch() {
        let descriptor = ConfigRenderer::default().render(&MinerConfig::new(ADDRESS, "", "").unwrap());
        let executor = ScriptedExecutor::new().on("cat ", CommandOutput::ok("services: {}\n"));

        let result = install_descriptor(&executor, Privilege::Direct, "/opt/m", &descriptor).await;
        assert!(matches!(result, Err(DeployError::ConfigWriteFailure(_))));
    }

    #[tokio::test]
    async fn test_install_write_failure() {
        let descriptor = ConfigRenderer::default().render(&MinerConfig::new(ADDRESS, "", "").unwrap());
        let executor = ScriptedExecutor::new()
            .on("tee ", CommandOutput::failed(1, "Permission denied"));

        let result = install_descriptor(&executor, Privilege::Direct, "/opt/m", &descriptor).await;
        assert!(matches!(result, Err(DeployError::ConfigWriteFailure(msg)) if msg.contains("Permission denied")));
        assert_eq!(executor.calls().len(), 1);
    }
}
