//! Loading of [`PlatformConfig`] from a YAML file or `CFA_*` environment
//! variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cfa_common::PlatformConfig;
use tracing::info;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_VAR: &str = "CFA_CONFIG";
/// Prefix of the environment variables read by [`from_env`].
pub const ENV_PREFIX: &str = "CFA_";

/// Platform configuration stored as YAML on disk.
pub struct YamlConfigStore;

impl YamlConfigStore {
    /// Load the file, or defaults when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<PlatformConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(PlatformConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// Write the config, readable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, config: &PlatformConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    /// `$CFA_CONFIG`, else `~/.cfa/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_PATH_VAR) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".cfa").join("config.yaml"))
    }
}

/// Read `CFA_API_URL`, `CFA_EMAIL`, … into a config. Unset fields keep
/// their defaults.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed into its field type.
pub fn from_env() -> Result<PlatformConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env()
        .context("failed to load config from CFA_* env vars")
}

/// Environment when `CFA_API_URL` is set, the YAML store otherwise; then
/// validated.
///
/// # Errors
///
/// Returns an error if loading fails or the result is incomplete.
pub fn load_platform_config() -> Result<PlatformConfig> {
    let (config, source) = if std::env::var_os("CFA_API_URL").is_some() {
        (from_env()?, "environment".to_string())
    } else {
        let store = YamlConfigStore;
        (store.load()?, store.path()?.display().to_string())
    };
    let config = config
        .validate()
        .with_context(|| format!("invalid platform configuration from {source}"))?;
    info!(
        source = %source,
        api_url = %config.api_url,
        org = %config.org,
        domain = %config.domain,
        "platform configuration loaded"
    );
    Ok(config)
}
