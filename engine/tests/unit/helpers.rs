//! Shared test helpers: a manual clock and a gateway over the in-memory platform.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Mutex;
use std::time::Duration;

use cfa_engine::application::ports::Clock;
use cfa_engine::domain::{App, ArtifactRef};
use cfa_engine::infra::artifact::LocalArtifactSource;
use cfa_engine::infra::gateway::{CfGateway, GatewaySettings};
use cfa_engine::infra::simulated::SimulatedPlatform;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

pub const SPACE: &str = "dev";
pub const SHARED_DOMAIN: &str = "example.org";

pub type SimGateway = CfGateway<SimulatedPlatform, LocalArtifactSource>;

// ── Clock ────────────────────────────────────────────────────────────────────

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(t0()))
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

// ── Gateway ──────────────────────────────────────────────────────────────────

pub fn settings() -> GatewaySettings {
    GatewaySettings {
        api_url: "https://api.example.org".to_string(),
        email: "deployer@example.org".to_string(),
        password: "s3cret".to_string(),
        org: "acme".to_string(),
        trust_self_signed_certs: false,
        proxy: None,
        shared_domain: SHARED_DOMAIN.to_string(),
        instance_info_timeout: Duration::from_secs(60),
        instance_retry_interval: Duration::from_millis(1),
        route_retry_attempts: 5,
    }
}

/// Gateway sharing state with `platform`, so the test can inspect it after.
pub fn gateway(platform: &SimulatedPlatform) -> SimGateway {
    CfGateway::new(platform.clone(), LocalArtifactSource, settings())
}

/// App whose binaries are not published yet, so a default bundle is used.
pub fn unpublished_app(name: &str) -> App {
    App::new(name, SPACE).with_binaries(
        ArtifactRef {
            coordinates: format!("com.acme:{name}:1.0"),
            extension: "war".to_string(),
            access_url: None,
        },
        true,
    )
}
