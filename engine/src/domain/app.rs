//! Desired state of an app and the remote states it can be observed in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ActivationError, ResourceKind};
use crate::domain::route::RouteUri;

pub const DEFAULT_RAM_MB: u32 = 256;
pub const DEFAULT_DISK_MB: u32 = 1024;
/// Seconds the platform waits for a new instance to answer its health check.
pub const HEALTH_CHECK_TIMEOUT_SECS: u32 = 180;

/// Where the binaries of an app come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Repository coordinates, e.g. `com.acme:joyn:1.0`.
    pub coordinates: String,
    /// Packaging: `war`, `jar` or `ear`.
    pub extension: String,
    /// Resolved download location, absent until the artifact is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_url: Option<String>,
}

/// A deployable unit scoped to one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub space: String,
    pub instance_count: u32,
    pub ram_mb: u32,
    pub disk_mb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binaries: Option<ArtifactRef>,
    /// A placeholder bundle is uploaded when the binaries have no location.
    #[serde(default)]
    pub optional_binaries: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub routes: Vec<RouteUri>,
    #[serde(default)]
    pub services: Vec<String>,
}

impl App {
    pub fn new(name: impl Into<String>, space: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            space: space.into(),
            instance_count: 1,
            ram_mb: DEFAULT_RAM_MB,
            disk_mb: DEFAULT_DISK_MB,
            binaries: None,
            optional_binaries: false,
            buildpack_url: None,
            stack: None,
            env: BTreeMap::new(),
            routes: Vec::new(),
            services: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_instances(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    #[must_use]
    pub fn with_memory(mut self, ram_mb: u32, disk_mb: u32) -> Self {
        self.ram_mb = ram_mb;
        self.disk_mb = disk_mb;
        self
    }

    #[must_use]
    pub fn with_binaries(mut self, binaries: ArtifactRef, optional: bool) -> Self {
        self.binaries = Some(binaries);
        self.optional_binaries = optional;
        self
    }

    #[must_use]
    pub fn with_buildpack(mut self, url: impl Into<String>, stack: Option<String>) -> Self {
        self.buildpack_url = Some(url.into());
        self.stack = stack;
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: RouteUri) -> Self {
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }

    pub fn validate(&self) -> Result<(), ActivationError> {
        let invalid = |reason: String| ActivationError::Invalid {
            kind: ResourceKind::App,
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if self.space.trim().is_empty() {
            return Err(invalid(format!("'{}' has no space", self.name)));
        }
        if self.instance_count == 0 {
            return Err(invalid(format!("'{}' needs at least one instance", self.name)));
        }
        if self.ram_mb == 0 || self.disk_mb == 0 {
            return Err(invalid(format!("'{}' has an empty memory or disk quota", self.name)));
        }
        if self.binaries.is_none() && !self.optional_binaries {
            return Err(invalid(format!("'{}' declares no binaries", self.name)));
        }
        for route in &self.routes {
            route.validate()?;
        }
        Ok(())
    }
}

/// Aggregate run state reported for an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Started,
    Stopped,
    Updating,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "STARTED",
            Self::Stopped => "STOPPED",
            Self::Updating => "UPDATING",
        })
    }
}

/// Per-instance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Starting,
    Running,
    Crashed,
    Down,
}
