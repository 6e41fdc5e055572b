//! Control-plane gateway: the production implementation of the gateway ports.
//!
//! Every method opens its own [`Session`] as its first action and lets the
//! guard log out on return. Nothing is cached between calls.

mod apps;
mod routes;
mod services;
mod session;
mod spaces;

use std::time::Duration;

use cfa_common::{PlatformConfig, normalize_domain};

use crate::application::ports::{ControlPlane, LoginRequest};
use crate::domain::PlatformError;

pub use session::Session;

/// Pause between instance-info reads answered with a server error.
pub const INSTANCE_RETRY_INTERVAL: Duration = Duration::from_secs(2);

const DEFAULT_PROXY_PORT: u16 = 80;

/// Credentials, target and tuning of a gateway.
#[derive(Clone)]
pub struct GatewaySettings {
    pub api_url: String,
    pub email: String,
    pub password: String,
    pub org: String,
    pub trust_self_signed_certs: bool,
    pub proxy: Option<(String, u16)>,
    /// Normalized shared top-level domain, never deleted by app removal.
    pub shared_domain: String,
    pub instance_info_timeout: Duration,
    pub instance_retry_interval: Duration,
    pub route_retry_attempts: u32,
}

impl From<&PlatformConfig> for GatewaySettings {
    fn from(config: &PlatformConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            org: config.org.clone(),
            trust_self_signed_certs: config.trust_self_signed_certs,
            proxy: config
                .proxy_host
                .clone()
                .map(|host| (host, config.proxy_port.unwrap_or(DEFAULT_PROXY_PORT))),
            shared_domain: normalize_domain(&config.domain),
            instance_info_timeout: config.instance_info_timeout(),
            instance_retry_interval: INSTANCE_RETRY_INTERVAL,
            route_retry_attempts: config.route_retry_attempts,
        }
    }
}

impl GatewaySettings {
    fn login_request(&self, space: Option<&str>) -> LoginRequest {
        LoginRequest {
            api_url: self.api_url.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            org: self.org.clone(),
            space: space.map(str::to_owned),
            trust_self_signed_certs: self.trust_self_signed_certs,
            proxy: self.proxy.clone(),
        }
    }
}

/// Gateway over a control-plane SDK `P`, fetching binaries through `A`.
pub struct CfGateway<P, A> {
    platform: P,
    artifacts: A,
    settings: GatewaySettings,
}

impl<P: ControlPlane, A> CfGateway<P, A> {
    pub fn new(platform: P, artifacts: A, settings: GatewaySettings) -> Self {
        Self {
            platform,
            artifacts,
            settings,
        }
    }

    pub fn from_config(platform: P, artifacts: A, config: &PlatformConfig) -> Self {
        Self::new(platform, artifacts, GatewaySettings::from(config))
    }

    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Log in, scoped to `space`, or to the organization for `None`.
    async fn open(&self, space: Option<&str>) -> Result<Session<P::Session>, PlatformError> {
        let request = self.settings.login_request(space);
        let inner = self.platform.login(&request).await?;
        let scope = match space {
            Some(space) => format!("{}/{space}", self.settings.org),
            None => self.settings.org.clone(),
        };
        Ok(Session::new(inner, scope))
    }
}
