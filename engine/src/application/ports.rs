//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `cfa_common`, never from
//! `crate::infra`.
//!
//! Two levels live here: the control-plane SDK ports ([`ControlPlane`],
//! [`PlatformSession`]), which speak in [`PlatformError`], and the gateway
//! ports the use-cases depend on, which speak in [`ActivationError`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    ActivationError, App, AppState, ArtifactRef, InstanceState, LastOperation, ManagedService,
    PlatformError, RouteUri, SpaceRole, UserProvidedService,
};

// ── SDK value types ───────────────────────────────────────────────────────────

/// Credentials and target of one control-plane session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub api_url: String,
    pub email: String,
    pub password: String,
    pub org: String,
    /// `None` scopes the session to the organization.
    pub space: Option<String>,
    pub trust_self_signed_certs: bool,
    pub proxy: Option<(String, u16)>,
}

/// Staging parameters sent with a new application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staging {
    pub buildpack_url: Option<String>,
    pub stack: Option<String>,
    pub health_check_timeout_secs: u32,
}

/// Everything the SDK needs to register a new application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAppRequest {
    pub name: String,
    pub staging: Staging,
    pub disk_mb: u32,
    pub ram_mb: u32,
    pub uris: Vec<String>,
    pub services: Vec<String>,
}

/// Application summary as read back from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub guid: String,
    pub name: String,
    pub state: AppState,
    pub instances: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceInfo {
    pub index: u32,
    pub state: InstanceState,
}

/// Resource usage of one instance, dumped with diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceStats {
    pub index: u32,
    pub state: InstanceState,
    pub cpu: f64,
    pub mem_bytes: u64,
    pub disk_bytes: u64,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    /// `None` for user-provided services and brokers that report nothing.
    pub last_operation: Option<LastOperation>,
    pub bound_apps: Vec<String>,
}

// ── SDK ports ─────────────────────────────────────────────────────────────────

/// Entry point of the control-plane SDK: turns credentials into a session.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    type Session: PlatformSession;

    async fn login(&self, request: &LoginRequest) -> Result<Self::Session, PlatformError>;
}

/// Primitives available on a logged-in session. App, service and route calls
/// act on the session's space; domain and space calls on its organization.
#[allow(async_fn_in_trait)]
pub trait PlatformSession {
    /// Release the session. Called exactly once, from the session guard.
    fn logout(&self);

    // apps
    async fn create_app(&self, request: &CreateAppRequest) -> Result<String, PlatformError>;
    async fn app(&self, name: &str) -> Result<AppRecord, PlatformError>;
    async fn scale_instances(&self, name: &str, instances: u32) -> Result<(), PlatformError>;
    async fn update_env(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), PlatformError>;
    async fn upload_bits(&self, name: &str, bundle: &Path) -> Result<(), PlatformError>;
    async fn start_app(&self, name: &str) -> Result<(), PlatformError>;
    async fn stop_app(&self, name: &str) -> Result<(), PlatformError>;
    async fn delete_app(&self, name: &str) -> Result<(), PlatformError>;
    async fn app_instances(&self, name: &str) -> Result<Vec<InstanceInfo>, PlatformError>;
    async fn app_routes(&self, name: &str) -> Result<Vec<RouteUri>, PlatformError>;
    async fn recent_logs(&self, name: &str) -> Result<Vec<String>, PlatformError>;
    async fn staging_logs(&self, name: &str) -> Result<Vec<String>, PlatformError>;
    async fn app_stats(&self, name: &str) -> Result<Vec<InstanceStats>, PlatformError>;

    // services
    async fn services(&self) -> Result<Vec<ServiceRecord>, PlatformError>;
    async fn service(&self, name: &str) -> Result<ServiceRecord, PlatformError>;
    async fn create_user_provided_service(
        &self,
        service: &UserProvidedService,
    ) -> Result<(), PlatformError>;
    async fn create_service(&self, service: &ManagedService) -> Result<(), PlatformError>;
    async fn delete_service(&self, name: &str) -> Result<(), PlatformError>;
    async fn bind_service(&self, app: &str, service: &str) -> Result<(), PlatformError>;
    async fn unbind_service(&self, app: &str, service: &str) -> Result<(), PlatformError>;

    // domains and routes
    async fn domains(&self) -> Result<Vec<String>, PlatformError>;
    async fn add_domain(&self, domain: &str) -> Result<(), PlatformError>;
    async fn delete_domain(&self, domain: &str) -> Result<(), PlatformError>;
    async fn routes(&self) -> Result<Vec<RouteUri>, PlatformError>;
    async fn create_route(&self, route: &RouteUri) -> Result<(), PlatformError>;
    async fn delete_route(&self, route: &RouteUri) -> Result<(), PlatformError>;

    // spaces
    async fn spaces(&self) -> Result<Vec<String>, PlatformError>;
    async fn create_space(&self, name: &str) -> Result<(), PlatformError>;
    async fn delete_space(&self, name: &str) -> Result<(), PlatformError>;
    async fn associate_role(
        &self,
        space: &str,
        user: &str,
        role: SpaceRole,
    ) -> Result<(), PlatformError>;
}

// ── Gateway ports ─────────────────────────────────────────────────────────────

/// App create, start, stop, delete.
#[allow(async_fn_in_trait)]
pub trait AppLifecycle {
    /// Create, configure and upload the app. Returns the platform GUID.
    async fn create_app(&self, app: &App) -> Result<String, ActivationError>;
    /// Start and verify the aggregate state; does not wait for instances.
    async fn start_app(&self, space: &str, name: &str, instances: u32)
    -> Result<(), ActivationError>;
    async fn stop_app(&self, space: &str, name: &str) -> Result<(), ActivationError>;
    /// Delete the app after its routes and private route domains.
    async fn delete_app(&self, space: &str, name: &str) -> Result<(), ActivationError>;
}

/// App existence, run state and instance health.
#[allow(async_fn_in_trait)]
pub trait AppInspector {
    async fn app_exists(&self, space: &str, name: &str) -> Result<bool, ActivationError>;
    /// `None` when the app does not exist.
    async fn app_state(&self, space: &str, name: &str)
    -> Result<Option<AppState>, ActivationError>;
    /// Instances currently running. Transient read failures count as zero;
    /// only a definitive staging failure is an error.
    async fn count_running_instances(
        &self,
        space: &str,
        name: &str,
        expected: u32,
    ) -> Result<u32, ActivationError>;
    /// Best-effort dump of logs and stats. Never fails.
    async fn log_app_diagnostics(&self, space: &str, name: &str);
}

/// Service instances and bindings.
#[allow(async_fn_in_trait)]
pub trait ServiceGateway {
    async fn service_exists(&self, space: &str, name: &str) -> Result<bool, ActivationError>;
    async fn create_user_provided_service(
        &self,
        service: &UserProvidedService,
    ) -> Result<(), ActivationError>;
    async fn create_managed_service(&self, service: &ManagedService)
    -> Result<(), ActivationError>;
    async fn delete_service(&self, space: &str, name: &str) -> Result<(), ActivationError>;
    /// `None` when the instance is gone or reports no operation.
    async fn last_operation(
        &self,
        space: &str,
        name: &str,
    ) -> Result<Option<LastOperation>, ActivationError>;
    async fn list_services(&self, space: &str) -> Result<Vec<String>, ActivationError>;
    async fn is_service_bound(
        &self,
        space: &str,
        app: &str,
        service: &str,
    ) -> Result<bool, ActivationError>;
    async fn bind_service(&self, space: &str, app: &str, service: &str)
    -> Result<(), ActivationError>;
    async fn unbind_service(
        &self,
        space: &str,
        app: &str,
        service: &str,
    ) -> Result<(), ActivationError>;
}

/// Candidate derivation handed to route creation: `(original, attempt)`.
pub type DeriveRoute<'a> = &'a dyn Fn(&RouteUri, u32) -> RouteUri;

/// Org domains and space routes.
#[allow(async_fn_in_trait)]
pub trait RouteGateway {
    async fn domain_exists(&self, domain: &str) -> Result<bool, ActivationError>;
    async fn add_domain(&self, domain: &str) -> Result<(), ActivationError>;
    async fn delete_domain(&self, domain: &str) -> Result<(), ActivationError>;
    async fn route_exists(&self, space: &str, route: &RouteUri) -> Result<bool, ActivationError>;
    /// Create the route, trying derived candidates while the platform
    /// rejects the name. Returns the route actually created.
    async fn create_route(
        &self,
        space: &str,
        route: &RouteUri,
        derive: DeriveRoute<'_>,
    ) -> Result<RouteUri, ActivationError>;
    async fn delete_route(&self, space: &str, route: &RouteUri) -> Result<(), ActivationError>;
}

/// Org-level space management.
#[allow(async_fn_in_trait)]
pub trait SpaceGateway {
    async fn space_exists(&self, name: &str) -> Result<bool, ActivationError>;
    async fn create_space(&self, name: &str) -> Result<(), ActivationError>;
    async fn delete_space(&self, name: &str) -> Result<(), ActivationError>;
    /// Grant `role` on `space` to the user the gateway logs in as.
    async fn associate_role(&self, space: &str, role: SpaceRole) -> Result<(), ActivationError>;
}

/// Composite trait: any type implementing all gateway sub-traits is a `Gateway`.
pub trait Gateway:
    AppLifecycle + AppInspector + ServiceGateway + RouteGateway + SpaceGateway
{
}

/// Blanket implementation: any type implementing all sub-traits is a `Gateway`.
impl<T> Gateway for T where
    T: AppLifecycle + AppInspector + ServiceGateway + RouteGateway + SpaceGateway
{
}

// ── Artifact and clock ports ──────────────────────────────────────────────────

/// Turns an artifact reference into a local file ready for upload.
#[allow(async_fn_in_trait)]
pub trait ArtifactSource {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<PathBuf>;
}

/// Wall-clock source, injected so timeouts can be tested deterministically.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}
