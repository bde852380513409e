//! Descriptor rendering scenarios

use miner_deploy::app::options::ComposeOptions;
use miner_deploy::deploy::compose::{
    ConfigRenderer, ENV_BTC_ADDRESS, ENV_CONTAINER_MARKER, ENV_LOG_LEVEL, ENV_QUIET_MODE,
    ENV_TELEGRAM_TOKEN, ENV_TELEGRAM_USER_ID,
};
use miner_deploy::models::miner::{is_numeric_id, MinerConfig};

const ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

fn renderer() -> ConfigRenderer {
    ConfigRenderer::new(ComposeOptions {
        service_name: "btc-miner".to_string(),
        container_name: "btc-solo-miner".to_string(),
    })
}

#[test]
fn test_address_only_has_four_base_entries() {
    let config = MinerConfig::new(ADDRESS, "", "").unwrap();
    let descriptor = renderer().render(&config);
    let service = descriptor.service("btc-miner").unwrap();

    assert_eq!(
        service.env_keys(),
        vec![ENV_BTC_ADDRESS, ENV_QUIET_MODE, ENV_LOG_LEVEL, ENV_CONTAINER_MARKER]
    );
    assert_eq!(service.env(ENV_BTC_ADDRESS), Some(ADDRESS));

    let yaml = descriptor.to_yaml().unwrap();
    assert!(!yaml.contains("TELEGRAM"));
}

#[test]
fn test_token_without_id_renders_without_telegram() {
    let config = MinerConfig::new(ADDRESS, "123456:ABC-token", "").unwrap();
    let service = renderer().render(&config).service("btc-miner").cloned().unwrap();

    assert!(service.env(ENV_TELEGRAM_TOKEN).is_none());
    assert!(service.env(ENV_TELEGRAM_USER_ID).is_none());
    assert_eq!(service.env_keys().len(), 4);
}

#[test]
fn test_complete_telegram_pair_is_rendered() {
    let config = MinerConfig::new(ADDRESS, "123456:ABC-token", "123456789").unwrap();
    let service = renderer().render(&config).service("btc-miner").cloned().unwrap();

    assert_eq!(service.env(ENV_TELEGRAM_TOKEN), Some("123456:ABC-token"));
    assert_eq!(service.env(ENV_TELEGRAM_USER_ID), Some("123456789"));
}

#[test]
fn test_rendering_is_deterministic() {
    for address in [ADDRESS, "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", "x"] {
        let config = MinerConfig::new(address, "t", "42").unwrap();
        let first = renderer().render(&config).to_yaml().unwrap();
        let second = renderer().render(&config).to_yaml().unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_numeric_id_validator() {
    assert!(is_numeric_id("123456789"));
    assert!(!is_numeric_id("abc123"));
    assert!(!is_numeric_id("12 34"));
    assert!(!is_numeric_id(""));
}
