//! Platform configuration loading from YAML and `CFA_*` environment variables.
//!
//! Every test here mutates process environment, so all run under `#[serial]`.

#![allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]

use std::time::Duration;

use cfa_common::PlatformConfig;
use cfa_engine::application::services::polling::PollTimeouts;
use cfa_engine::infra::config::{
    CONFIG_PATH_VAR, YamlConfigStore, from_env, load_platform_config,
};
use cfa_engine::infra::gateway::GatewaySettings;
use serial_test::serial;
use tempfile::TempDir;

const VARS: [&str; 8] = [
    CONFIG_PATH_VAR,
    "CFA_API_URL",
    "CFA_EMAIL",
    "CFA_PASSWORD",
    "CFA_ORG",
    "CFA_DOMAIN",
    "CFA_PROXY_HOST",
    "CFA_APP_START_TIMEOUT_SECS",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: tests in this module are serialized
        unsafe { std::env::remove_var(var) };
    }
}

fn set(var: &str, value: &str) {
    // SAFETY: tests in this module are serialized
    unsafe { std::env::set_var(var, value) };
}

fn complete_config() -> PlatformConfig {
    PlatformConfig {
        api_url: "https://api.run.acme.io".to_string(),
        email: "deployer@acme.io".to_string(),
        password: "s3cret".to_string(),
        org: "acme".to_string(),
        domain: "run.acme.io".to_string(),
        ..PlatformConfig::default()
    }
}

#[test]
#[serial]
fn yaml_store_round_trips_through_config_path_var() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yaml");
    set(CONFIG_PATH_VAR, path.to_str().unwrap());
    let store = YamlConfigStore;

    store.save(&complete_config()).expect("save");
    let loaded = store.load().expect("load");
    clear_env();

    assert_eq!(loaded, complete_config());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
#[serial]
fn missing_yaml_file_yields_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    set(CONFIG_PATH_VAR, dir.path().join("absent.yaml").to_str().unwrap());

    let loaded = YamlConfigStore.load().expect("load");
    clear_env();

    assert_eq!(loaded, PlatformConfig::default());
}

#[test]
#[serial]
fn env_vars_override_defaults() {
    clear_env();
    set("CFA_API_URL", "https://api.run.acme.io");
    set("CFA_EMAIL", "deployer@acme.io");
    set("CFA_PASSWORD", "s3cret");
    set("CFA_ORG", "acme");
    set("CFA_DOMAIN", "Run.Acme.IO.");
    set("CFA_APP_START_TIMEOUT_SECS", "120");

    let config = load_platform_config();
    clear_env();
    let config = config.expect("load");

    assert_eq!(config.domain, "run.acme.io");
    assert_eq!(config.app_start_timeout(), Duration::from_secs(120));
    assert_eq!(PollTimeouts::from(&config).app_start, Duration::from_secs(120));
    assert_eq!(GatewaySettings::from(&config).shared_domain, "run.acme.io");
}

#[test]
#[serial]
fn unparsable_env_value_is_an_error() {
    clear_env();
    set("CFA_APP_START_TIMEOUT_SECS", "ten minutes");

    let result = from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn incomplete_config_is_rejected() {
    clear_env();
    set("CFA_API_URL", "https://api.run.acme.io");

    let result = load_platform_config();
    clear_env();

    let err = format!("{:#}", result.unwrap_err());
    assert!(err.contains("invalid platform configuration from environment"), "got: {err}");
}

#[test]
#[serial]
fn proxy_without_port_uses_http_default() {
    clear_env();
    let mut config = complete_config();
    config.proxy_host = Some("proxy.acme.io".to_string());

    let settings = GatewaySettings::from(&config);

    assert_eq!(settings.proxy, Some(("proxy.acme.io".to_string(), 80)));
}
