use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and tuning parameters for one control-plane target.
///
/// Every field has a serde default so partial YAML files and environment
/// overrides load; [`PlatformConfig::validate`] rejects what is still missing.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Control-plane API endpoint, e.g. `https://api.example.org`.
    #[serde(default)]
    pub api_url: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Organization owning every space this engine touches.
    #[serde(default)]
    pub org: String,

    /// Shared top-level domain. Never deleted as a side effect of app removal.
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub trust_self_signed_certs: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<u16>,

    /// Budget for all instances of an app to report running (default: 600).
    #[serde(default = "default_app_start_timeout_secs")]
    pub app_start_timeout_secs: u64,

    /// Budget for a managed service's last operation to settle (default: 600).
    #[serde(default = "default_service_timeout_secs")]
    pub service_timeout_secs: u64,

    /// Bound on a single instance-info read (default: 60).
    #[serde(default = "default_instance_info_timeout_secs")]
    pub instance_info_timeout_secs: u64,

    /// Candidates tried before route creation gives up (default: 5).
    #[serde(default = "default_route_retry_attempts")]
    pub route_retry_attempts: u32,
}

fn default_app_start_timeout_secs() -> u64 {
    600
}

fn default_service_timeout_secs() -> u64 {
    600
}

fn default_instance_info_timeout_secs() -> u64 {
    60
}

fn default_route_retry_attempts() -> u32 {
    5
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            email: String::new(),
            password: String::new(),
            org: String::new(),
            domain: String::new(),
            trust_self_signed_certs: false,
            proxy_host: None,
            proxy_port: None,
            app_start_timeout_secs: default_app_start_timeout_secs(),
            service_timeout_secs: default_service_timeout_secs(),
            instance_info_timeout_secs: default_instance_info_timeout_secs(),
            route_retry_attempts: default_route_retry_attempts(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_url", &self.api_url)
            .field("email", &self.email)
            .field("password", &"***")
            .field("org", &self.org)
            .field("domain", &self.domain)
            .field("trust_self_signed_certs", &self.trust_self_signed_certs)
            .field("proxy_host", &self.proxy_host)
            .field("proxy_port", &self.proxy_port)
            .field("app_start_timeout_secs", &self.app_start_timeout_secs)
            .field("service_timeout_secs", &self.service_timeout_secs)
            .field("instance_info_timeout_secs", &self.instance_info_timeout_secs)
            .field("route_retry_attempts", &self.route_retry_attempts)
            .finish()
    }
}

/// Configuration rejected by [`PlatformConfig::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl PlatformConfig {
    /// Check mandatory settings and normalize the shared domain.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("api_url", &self.api_url),
            ("email", &self.email),
            ("password", &self.password),
            ("org", &self.org),
            ("domain", &self.domain),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "api_url",
                reason: format!("expected an http(s) URL, got {:?}", self.api_url),
            });
        }
        if self.proxy_port.is_some() && self.proxy_host.is_none() {
            return Err(ConfigError::Invalid {
                field: "proxy_port",
                reason: "set without proxy_host".to_string(),
            });
        }
        if self.route_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "route_retry_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        self.domain = normalize_domain(&self.domain);
        Ok(self)
    }

    #[must_use]
    pub fn app_start_timeout(&self) -> Duration {
        Duration::from_secs(self.app_start_timeout_secs)
    }

    #[must_use]
    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_secs)
    }

    #[must_use]
    pub fn instance_info_timeout(&self) -> Duration {
        Duration::from_secs(self.instance_info_timeout_secs)
    }
}

/// Canonical form used for every domain comparison: trimmed, lowercase, no
/// trailing dot. Dots and whitespace are stripped together at the end so the
/// result is a fixed point.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    domain
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_ascii_lowercase()
}
