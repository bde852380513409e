//! Operator input collection
//!
//! Values given as flags or environment variables are taken as-is; anything
//! still missing is prompted for, or rejected when prompting is disabled.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};
use secrecy::{ExposeSecret, SecretString};

use crate::app::run::TargetRequest;
use crate::deploy::negotiate::ConnectRequest;
use crate::errors::DeployError;
use crate::models::miner::{is_numeric_id, MinerConfig};
use crate::models::target::{AuthMode, DeployMode};

/// Environment variable read for the ssh password
pub const ENV_SSH_PASSWORD: &str = "MINER_DEPLOY_SSH_PASSWORD";

const DEFAULT_USER: &str = "root";

/// Values already known before prompting
#[derive(Debug, Clone, Default)]
pub struct Prefill {
    pub mode: Option<DeployMode>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: u16,
    pub auth: Option<AuthMode>,
    pub password: Option<SecretString>,
    pub btc_address: Option<String>,
    /// Source repository for remote targets
    pub repo_url: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_user_id: Option<String>,
    pub quiet: bool,
}

/// Everything a run needs from the operator
#[derive(Debug)]
pub struct CollectedInput {
    pub target: TargetRequest,
    pub config: MinerConfig,
    /// Always set for remote targets
    pub repo_url: Option<String>,
}

pub struct InputCollector {
    prefill: Prefill,
    interactive: bool,
    theme: ColorfulTheme,
}

impl InputCollector {
    pub fn new(prefill: Prefill, interactive: bool) -> Self {
        Self {
            prefill,
            interactive,
            theme: ColorfulTheme::default(),
        }
    }

    pub fn collect(&self) -> Result<CollectedInput, DeployError> {
        if let Some(id) = non_empty(&self.prefill.telegram_user_id) {
            if !is_numeric_id(id) {
                return Err(DeployError::ValidationFailure(format!(
                    "Telegram user id must be numeric, got {:?}",
                    id
                )));
            }
        }

        let mode = match self.prefill.mode {
            Some(mode) => mode,
            None if self.interactive => {
                let index = Select::with_theme(&self.theme)
                    .with_prompt("Deployment mode")
                    .items(&["local", "remote"])
                    .default(1)
                    .interact()?;
                if index == 0 {
                    DeployMode::Local
                } else {
                    DeployMode::Remote
                }
            }
            None => DeployMode::default(),
        };

        let (target, repo_url) = match mode {
            DeployMode::Local => (
                TargetRequest::Local,
                non_empty(&self.prefill.repo_url).map(str::to_string),
            ),
            DeployMode::Remote => {
                let request = self.connect_request()?;
                let repo_url = match non_empty(&self.prefill.repo_url) {
                    Some(url) => url.to_string(),
                    None => self.required_text(
                        "Source repository URL",
                        "--repo-url or repo_url in the settings file",
                    )?,
                };
                (TargetRequest::Remote(request), Some(repo_url))
            }
        };

        let btc_address = match non_empty(&self.prefill.btc_address) {
            Some(address) => address.to_string(),
            None => self.required_text("Bitcoin address", "--address or BTC_ADDRESS")?,
        };

        let (token, user_id) = self.telegram()?;
        let config = MinerConfig::new(&btc_address, &token, &user_id)?
            .with_quiet_mode(self.prefill.quiet);

        Ok(CollectedInput {
            target,
            config,
            repo_url,
        })
    }

    fn connect_request(&self) -> Result<ConnectRequest, DeployError> {
        let host = match non_empty(&self.prefill.host) {
            Some(host) => host.to_string(),
            None => self.required_text("Remote host", "--host")?,
        };

        let user = match non_empty(&self.prefill.user) {
            Some(user) => user.to_string(),
            None if self.interactive => Input::<String>::with_theme(&self.theme)
                .with_prompt("Remote user")
                .default(DEFAULT_USER.to_string())
                .interact_text()?,
            None => DEFAULT_USER.to_string(),
        };

        let auth = match self.prefill.auth {
            Some(auth) => auth,
            None if self.interactive => {
                let index = Select::with_theme(&self.theme)
                    .with_prompt("Authentication")
                    .items(&["ssh key", "password"])
                    .default(0)
                    .interact()?;
                if index == 0 {
                    AuthMode::Key
                } else {
                    AuthMode::Password
                }
            }
            None => AuthMode::default(),
        };

        let password = match auth {
            AuthMode::Key => None,
            AuthMode::Password => Some(self.password()?),
        };

        Ok(ConnectRequest {
            host,
            user,
            port: self.prefill.port,
            auth,
            password,
        })
    }

    fn password(&self) -> Result<SecretString, DeployError> {
        if let Some(password) = &self.prefill.password {
            if !password.expose_secret().is_empty() {
                return Ok(password.clone());
            }
        }
        if !self.interactive {
            return Err(DeployError::ValidationFailure(format!(
                "Password authentication requires {} when prompts are disabled",
                ENV_SSH_PASSWORD
            )));
        }

        let password = Password::with_theme(&self.theme)
            .with_prompt("SSH password")
            .interact()?;
        Ok(SecretString::from(password))
    }

    /// Token and user id; empty strings when not given
    fn telegram(&self) -> Result<(String, String), DeployError> {
        let token = match non_empty(&self.prefill.telegram_token) {
            Some(token) => token.to_string(),
            None if self.interactive => Input::<String>::with_theme(&self.theme)
                .with_prompt("Telegram bot token (optional)")
                .allow_empty(true)
                .interact_text()?,
            None => String::new(),
        };

        let user_id = match non_empty(&self.prefill.telegram_user_id) {
            Some(id) => id.to_string(),
            None if self.interactive && !token.trim().is_empty() => {
                Input::<String>::with_theme(&self.theme)
                    .with_prompt("Telegram user id")
                    .allow_empty(true)
                    .validate_with(|input: &String| -> Result<(), &str> {
                        let input = input.trim();
                        if input.is_empty() || is_numeric_id(input) {
                            Ok(())
                        } else {
                            Err("digits only")
                        }
                    })
                    .interact_text()?
            }
            None => String::new(),
        };

        Ok((token, user_id))
    }

    fn required_text(&self, prompt: &str, source: &str) -> Result<String, DeployError> {
        if !self.interactive {
            return Err(DeployError::ValidationFailure(format!(
                "{} is required (pass {})",
                prompt, source
            )));
        }

        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().is_empty() {
                    Err("required")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;
        Ok(value.trim().to_string())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    const REPO_URL: &str = "https://example.com/btc-solo-miner.git";

    fn prefill() -> Prefill {
        Prefill {
            port: 22,
            btc_address: Some(ADDRESS.to_string()),
            repo_url: Some(REPO_URL.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_remote_defaults() {
        let input = InputCollector::new(
            Prefill {
                host: Some(" 192.0.2.9 ".to_string()),
                ..prefill()
            },
            false,
        )
        .collect()
        .unwrap();

        match input.target {
            TargetRequest::Remote(request) => {
                assert_eq!(request.host, "192.0.2.9");
                assert_eq!(request.user, "root");
                assert_eq!(request.auth, AuthMode::Key);
                assert!(request.password.is_none());
            }
            other => panic!("unexpected target: {:?}", other),
        }
        assert_eq!(input.config.btc_address(), ADDRESS);
        assert_eq!(input.repo_url.as_deref(), Some(REPO_URL));
    }

    #[test]
    fn test_remote_requires_repo_url_without_prompts() {
        let result = InputCollector::new(
            Prefill {
                host: Some("192.0.2.9".to_string()),
                repo_url: Some(" ".to_string()),
                ..prefill()
            },
            false,
        )
        .collect();

        match result {
            Err(DeployError::ValidationFailure(msg)) => assert!(msg.contains("--repo-url")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_local_does_not_need_repo_url() {
        let input = InputCollector::new(
            Prefill {
                mode: Some(DeployMode::Local),
                repo_url: None,
                ..prefill()
            },
            false,
        )
        .collect()
        .unwrap();

        assert!(input.repo_url.is_none());
    }

    #[test]
    fn test_missing_host_without_prompts() {
        let result = InputCollector::new(prefill(), false).collect();
        assert!(matches!(result, Err(DeployError::ValidationFailure(_))));
    }

    #[test]
    fn test_missing_address_without_prompts() {
        let collector = InputCollector::new(
            Prefill {
                mode: Some(DeployMode::Local),
                btc_address: Some("   ".to_string()),
                ..prefill()
            },
            false,
        );
        assert!(matches!(collector.collect(), Err(DeployError::ValidationFailure(_))));
    }

    #[test]
    fn test_password_from_prefill() {
        let input = InputCollector::new(
            Prefill {
                host: Some("h".to_string()),
                auth: Some(AuthMode::Password),
                password: Some(SecretString::from("hunter2")),
                ..prefill()
            },
            false,
        )
        .collect()
        .unwrap();

        match input.target {
            TargetRequest::Remote(request) => {
                assert_eq!(request.password.unwrap().expose_secret(), "hunter2");
            }
            other => panic!("unexpected target: {:?}", other),
        }
    }

    #[test]
    fn test_password_required_without_prompts() {
        let collector = InputCollector::new(
            Prefill {
                host: Some("h".to_string()),
                auth: Some(AuthMode::Password),
                ..prefill()
            },
            false,
        );
        assert!(matches!(collector.collect(), Err(DeployError::ValidationFailure(_))));
    }

    #[test]
    fn test_non_numeric_telegram_id_is_rejected() {
        let collector = InputCollector::new(
            Prefill {
                mode: Some(DeployMode::Local),
                telegram_token: Some("123:abc".to_string()),
                telegram_user_id: Some("abc123".to_string()),
                ..prefill()
            },
            false,
        );
        assert!(matches!(collector.collect(), Err(DeployError::ValidationFailure(_))));
    }

    #[test]
    fn test_token_without_id_degrades() {
        let input = InputCollector::new(
            Prefill {
                mode: Some(DeployMode::Local),
                telegram_token: Some("123:abc".to_string()),
                quiet: true,
                ..prefill()
            },
            false,
        )
        .collect()
        .unwrap();

        assert!(matches!(input.target, TargetRequest::Local));
        assert!(input.config.telegram().is_none());
        assert!(input.config.quiet_mode());
    }
}
