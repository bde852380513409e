//! Miner configuration supplied by the operator

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::DeployError;

/// Telegram notification credentials for the workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub user_id: String,
}

impl TelegramConfig {
    /// Both halves present and the user id numeric
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && is_numeric_id(&self.user_id)
    }
}

/// What the workload container is started with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConfig {
    btc_address: String,
    quiet_mode: bool,
    telegram: Option<TelegramConfig>,
}

impl MinerConfig {
    /// Build a config from raw operator input.
    ///
    /// An empty address is rejected. Telegram is kept only when the token is
    /// non-empty and the user id is a non-empty run of digits; any other
    /// combination drops telegram with a warning instead of failing.
    pub fn new(
        btc_address: &str,
        telegram_token: &str,
        telegram_user_id: &str,
    ) -> Result<Self, DeployError> {
        let btc_address = btc_address.trim();
        if btc_address.is_empty() {
            return Err(DeployError::ValidationFailure(
                "Bitcoin address must not be empty".to_string(),
            ));
        }
        if !address_looks_valid(btc_address) {
            warn!("Bitcoin address format may be invalid: {}", btc_address);
        }

        let telegram = TelegramConfig {
            token: telegram_token.trim().to_string(),
            user_id: telegram_user_id.trim().to_string(),
        };
        let telegram = if telegram.is_complete() {
            Some(telegram)
        } else {
            if !telegram.token.is_empty() || !telegram.user_id.is_empty() {
                warn!("Telegram token and numeric user id are both required, notifications disabled");
            }
            None
        };

        Ok(Self {
            btc_address: btc_address.to_string(),
            quiet_mode: false,
            telegram,
        })
    }

    /// Ask the workload for quiet output
    pub fn with_quiet_mode(mut self, quiet_mode: bool) -> Self {
        self.quiet_mode = quiet_mode;
        self
    }

    pub fn btc_address(&self) -> &str {
        &self.btc_address
    }

    pub fn quiet_mode(&self) -> bool {
        self.quiet_mode
    }

    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.telegram.as_ref()
    }
}

/// Accepts a non-empty string made only of ASCII digits
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Loose shape check for legacy base58 addresses: 26 to 35 characters,
/// alphanumeric without the ambiguous `0`, `O`, `I` and `l`.
pub fn address_looks_valid(address: &str) -> bool {
    (26..=35).contains(&address.len())
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
}
