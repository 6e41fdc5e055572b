//! In-memory control plane.
//!
//! Implements the SDK ports with plain collections behind a mutex so the
//! whole engine can run without a platform: tests script instance readings,
//! broker operations, rejected route names and injected faults, then read
//! back the call journal. Clones share state.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::application::ports::{
    AppRecord, ControlPlane, CreateAppRequest, InstanceInfo, InstanceStats, LoginRequest,
    PlatformSession, ServiceRecord,
};
use crate::domain::{
    AppState, InstanceState, LastOperation, ManagedService, OperationState, PlatformError,
    RouteUri, SpaceRole, UserProvidedService,
};

type Key = (String, String);

#[derive(Debug, Clone)]
struct SimApp {
    guid: String,
    state: AppState,
    instances: u32,
    routes: Vec<RouteUri>,
    env: BTreeMap<String, String>,
    bits: Option<PathBuf>,
}

impl SimApp {
    fn new(guid: String) -> Self {
        Self {
            guid,
            state: AppState::Stopped,
            instances: 1,
            routes: Vec::new(),
            env: BTreeMap::new(),
            bits: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SimService {
    last_operation: Option<LastOperation>,
    bound_apps: Vec<String>,
}

#[derive(Debug, Default)]
struct SimState {
    spaces: BTreeSet<String>,
    domains: BTreeSet<String>,
    routes: BTreeMap<RouteUri, String>,
    apps: BTreeMap<Key, SimApp>,
    services: BTreeMap<Key, SimService>,
    roles: Vec<(String, String, SpaceRole)>,
    rejected_routes: BTreeSet<RouteUri>,
    staging_failures: HashMap<String, String>,
    instance_script: HashMap<String, VecDeque<u32>>,
    last_op_script: HashMap<String, VecDeque<LastOperation>>,
    failures: HashMap<String, PlatformError>,
    calls: Vec<String>,
    logins: u32,
    logouts: u32,
    next_guid: u64,
}

/// Next scripted value; the last one repeats once the script runs dry.
fn next_scripted<T: Clone>(script: Option<&mut VecDeque<T>>) -> Option<T> {
    let script = script?;
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

/// In-memory [`ControlPlane`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Setup ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn with_space(self, name: &str) -> Self {
        self.lock().spaces.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_domain(self, domain: &str) -> Self {
        self.lock().domains.insert(cfa_common::normalize_domain(domain));
        self
    }

    /// Existing app with `instances` requested instances.
    #[must_use]
    pub fn with_app(self, space: &str, name: &str, state: AppState, instances: u32) -> Self {
        {
            let mut s = self.lock();
            s.spaces.insert(space.to_string());
            s.next_guid += 1;
            let mut app = SimApp::new(format!("guid-{}", s.next_guid));
            app.state = state;
            app.instances = instances;
            s.apps.insert((space.to_string(), name.to_string()), app);
        }
        self
    }

    /// Existing route, mapped to `app` when given. Registers its domain.
    #[must_use]
    pub fn with_route(self, space: &str, route: &RouteUri, app: Option<&str>) -> Self {
        {
            let mut s = self.lock();
            s.domains.insert(route.domain.clone());
            s.routes.insert(route.clone(), space.to_string());
            if let Some(app) = app {
                if let Some(app) = s.apps.get_mut(&(space.to_string(), app.to_string())) {
                    app.routes.push(route.clone());
                }
            }
        }
        self
    }

    #[must_use]
    pub fn with_service(self, space: &str, name: &str, last_operation: Option<LastOperation>) -> Self {
        self.lock().services.insert(
            (space.to_string(), name.to_string()),
            SimService {
                last_operation,
                bound_apps: Vec::new(),
            },
        );
        self
    }

    /// Running-instance counts returned by successive instance reads of `app`.
    #[must_use]
    pub fn script_running_instances(self, app: &str, counts: &[u32]) -> Self {
        self.lock()
            .instance_script
            .insert(app.to_string(), counts.iter().copied().collect());
        self
    }

    /// Last operations returned by successive reads of `service`.
    #[must_use]
    pub fn script_last_operations(self, service: &str, ops: &[LastOperation]) -> Self {
        self.lock()
            .last_op_script
            .insert(service.to_string(), ops.iter().cloned().collect());
        self
    }

    /// Instance reads of `app` report a staging failure.
    #[must_use]
    pub fn fail_staging(self, app: &str, message: &str) -> Self {
        self.lock()
            .staging_failures
            .insert(app.to_string(), message.to_string());
        self
    }

    /// Route creation for exactly this route is rejected as taken.
    #[must_use]
    pub fn reject_route(self, route: &RouteUri) -> Self {
        self.lock().rejected_routes.insert(route.clone());
        self
    }

    /// Every call of the SDK primitive `op` (e.g. `"delete_app"`) fails.
    #[must_use]
    pub fn fail(self, op: &str, err: PlatformError) -> Self {
        self.lock().failures.insert(op.to_string(), err);
        self
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Journal of SDK calls, `"<op> <argument>"`, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of journal entries for the primitive `op`.
    #[must_use]
    pub fn count_calls(&self, op: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    #[must_use]
    pub fn logins(&self) -> u32 {
        self.lock().logins
    }

    #[must_use]
    pub fn logouts(&self) -> u32 {
        self.lock().logouts
    }

    #[must_use]
    pub fn has_space(&self, name: &str) -> bool {
        self.lock().spaces.contains(name)
    }

    #[must_use]
    pub fn has_domain(&self, domain: &str) -> bool {
        self.lock()
            .domains
            .contains(&cfa_common::normalize_domain(domain))
    }

    #[must_use]
    pub fn has_route(&self, route: &RouteUri) -> bool {
        self.lock().routes.contains_key(route)
    }

    #[must_use]
    pub fn has_service(&self, space: &str, name: &str) -> bool {
        self.lock()
            .services
            .contains_key(&(space.to_string(), name.to_string()))
    }

    #[must_use]
    pub fn app_state(&self, space: &str, name: &str) -> Option<AppState> {
        self.lock()
            .apps
            .get(&(space.to_string(), name.to_string()))
            .map(|a| a.state)
    }

    #[must_use]
    pub fn app_instances(&self, space: &str, name: &str) -> Option<u32> {
        self.lock()
            .apps
            .get(&(space.to_string(), name.to_string()))
            .map(|a| a.instances)
    }

    #[must_use]
    pub fn app_env(&self, space: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.lock()
            .apps
            .get(&(space.to_string(), name.to_string()))
            .map(|a| a.env.clone())
    }

    /// Path of the last bundle uploaded for the app.
    #[must_use]
    pub fn uploaded_bits(&self, space: &str, name: &str) -> Option<PathBuf> {
        self.lock()
            .apps
            .get(&(space.to_string(), name.to_string()))
            .and_then(|a| a.bits.clone())
    }

    /// Roles granted on `space`, in grant order.
    #[must_use]
    pub fn roles(&self, space: &str) -> Vec<SpaceRole> {
        self.lock()
            .roles
            .iter()
            .filter(|(s, _, _)| s == space)
            .map(|(_, _, role)| *role)
            .collect()
    }

    #[must_use]
    pub fn bound_apps(&self, space: &str, service: &str) -> Vec<String> {
        self.lock()
            .services
            .get(&(space.to_string(), service.to_string()))
            .map(|s| s.bound_apps.clone())
            .unwrap_or_default()
    }
}

impl ControlPlane for SimulatedPlatform {
    type Session = SimulatedSession;

    async fn login(&self, request: &LoginRequest) -> Result<SimulatedSession, PlatformError> {
        let mut s = self.lock();
        let scope = request.space.clone().unwrap_or_else(|| request.org.clone());
        s.calls.push(format!("login {scope}"));
        if let Some(err) = s.failures.get("login") {
            return Err(err.clone());
        }
        s.logins += 1;
        Ok(SimulatedSession {
            platform: self.clone(),
            space: request.space.clone(),
        })
    }
}

/// Session on a [`SimulatedPlatform`].
#[derive(Debug)]
pub struct SimulatedSession {
    platform: SimulatedPlatform,
    space: Option<String>,
}

impl SimulatedSession {
    /// Journal the call, apply injected faults, then run `f` on the state.
    fn call<T>(
        &self,
        op: &str,
        arg: &str,
        f: impl FnOnce(&mut SimState) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let mut s = self.platform.lock();
        s.calls.push(format!("{op} {arg}"));
        if let Some(err) = s.failures.get(op) {
            debug!(op, "simulated fault");
            return Err(err.clone());
        }
        f(&mut s)
    }

    fn space(&self) -> Result<String, PlatformError> {
        self.space
            .clone()
            .ok_or_else(|| PlatformError::Transport("session has no target space".to_string()))
    }

    fn key(&self, name: &str) -> Result<Key, PlatformError> {
        Ok((self.space()?, name.to_string()))
    }

    fn app_call<T>(
        &self,
        op: &str,
        name: &str,
        f: impl FnOnce(&mut SimApp) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let key = self.key(name)?;
        self.call(op, name, |s| match s.apps.get_mut(&key) {
            Some(app) => f(app),
            None => Err(PlatformError::NotFound(format!("app {name}"))),
        })
    }

    fn service_call<T>(
        &self,
        op: &str,
        name: &str,
        f: impl FnOnce(&mut SimService) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let key = self.key(name)?;
        self.call(op, name, |s| match s.services.get_mut(&key) {
            Some(service) => f(service),
            None => Err(PlatformError::NotFound(format!("service {name}"))),
        })
    }
}

impl PlatformSession for SimulatedSession {
    fn logout(&self) {
        let mut s = self.platform.lock();
        s.logouts += 1;
        let scope = self.space.clone().unwrap_or_default();
        s.calls.push(format!("logout {scope}"));
    }

    // apps

    async fn create_app(&self, request: &CreateAppRequest) -> Result<String, PlatformError> {
        let key = self.key(&request.name)?;
        let space = key.0.clone();
        self.call("create_app", &request.name, |s| {
            if s.apps.contains_key(&key) {
                return Err(PlatformError::Rejected(format!("app name {} is taken", request.name)));
            }
            s.next_guid += 1;
            let mut app = SimApp::new(format!("guid-{}", s.next_guid));
            for uri in &request.uris {
                if let Some((host, domain)) = uri.split_once('.') {
                    let route = RouteUri::new(host, domain);
                    s.domains.insert(route.domain.clone());
                    s.routes.insert(route.clone(), space.clone());
                    app.routes.push(route);
                }
            }
            for service in &request.services {
                if let Some(service) = s.services.get_mut(&(space.clone(), service.clone())) {
                    service.bound_apps.push(request.name.clone());
                }
            }
            let guid = app.guid.clone();
            s.apps.insert(key, app);
            Ok(guid)
        })
    }

    async fn app(&self, name: &str) -> Result<AppRecord, PlatformError> {
        self.app_call("app", name, |app| {
            Ok(AppRecord {
                guid: app.guid.clone(),
                name: name.to_string(),
                state: app.state,
                instances: app.instances,
            })
        })
    }

    async fn scale_instances(&self, name: &str, instances: u32) -> Result<(), PlatformError> {
        self.app_call("scale_instances", name, |app| {
            app.instances = instances;
            Ok(())
        })
    }

    async fn update_env(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), PlatformError> {
        self.app_call("update_env", name, |app| {
            app.env.clone_from(env);
            Ok(())
        })
    }

    async fn upload_bits(&self, name: &str, bundle: &Path) -> Result<(), PlatformError> {
        if !bundle.is_file() {
            return Err(PlatformError::Rejected(format!(
                "bundle {} is not a file",
                bundle.display()
            )));
        }
        self.app_call("upload_bits", name, |app| {
            app.bits = Some(bundle.to_path_buf());
            Ok(())
        })
    }

    async fn start_app(&self, name: &str) -> Result<(), PlatformError> {
        self.app_call("start_app", name, |app| {
            app.state = AppState::Started;
            Ok(())
        })
    }

    async fn stop_app(&self, name: &str) -> Result<(), PlatformError> {
        self.app_call("stop_app", name, |app| {
            app.state = AppState::Stopped;
            Ok(())
        })
    }

    async fn delete_app(&self, name: &str) -> Result<(), PlatformError> {
        let key = self.key(name)?;
        self.call("delete_app", name, |s| {
            s.apps
                .remove(&key)
                .map(|_| ())
                .ok_or_else(|| PlatformError::NotFound(format!("app {name}")))
        })
    }

    async fn app_instances(&self, name: &str) -> Result<Vec<InstanceInfo>, PlatformError> {
        let key = self.key(name)?;
        self.call("app_instances", name, |s| {
            if let Some(message) = s.staging_failures.get(name) {
                return Err(PlatformError::StagingFailed(message.clone()));
            }
            let Some(app) = s.apps.get(&key) else {
                return Err(PlatformError::NotFound(format!("app {name}")));
            };
            if app.state != AppState::Started {
                return Ok(Vec::new());
            }
            let requested = app.instances;
            let running = next_scripted(s.instance_script.get_mut(name))
                .unwrap_or(requested)
                .min(requested);
            Ok((0..requested)
                .map(|index| InstanceInfo {
                    index,
                    state: if index < running {
                        InstanceState::Running
                    } else {
                        InstanceState::Starting
                    },
                })
                .collect())
        })
    }

    async fn app_routes(&self, name: &str) -> Result<Vec<RouteUri>, PlatformError> {
        self.app_call("app_routes", name, |app| Ok(app.routes.clone()))
    }

    async fn recent_logs(&self, name: &str) -> Result<Vec<String>, PlatformError> {
        self.app_call("recent_logs", name, |app| {
            Ok(vec![format!("[APP/0] {name} ({}) state {}", app.guid, app.state)])
        })
    }

    async fn staging_logs(&self, name: &str) -> Result<Vec<String>, PlatformError> {
        let key = self.key(name)?;
        self.call("staging_logs", name, |s| {
            if !s.apps.contains_key(&key) {
                return Err(PlatformError::NotFound(format!("app {name}")));
            }
            Ok(match s.staging_failures.get(name) {
                Some(message) => vec![format!("-----> staging failed: {message}")],
                None => vec!["-----> staging complete".to_string()],
            })
        })
    }

    async fn app_stats(&self, name: &str) -> Result<Vec<InstanceStats>, PlatformError> {
        self.app_call("app_stats", name, |app| {
            Ok((0..app.instances)
                .map(|index| InstanceStats {
                    index,
                    state: if app.state == AppState::Started {
                        InstanceState::Running
                    } else {
                        InstanceState::Down
                    },
                    cpu: 0.0,
                    mem_bytes: 0,
                    disk_bytes: 0,
                    uptime_secs: 0,
                })
                .collect())
        })
    }

    // services

    async fn services(&self) -> Result<Vec<ServiceRecord>, PlatformError> {
        let space = self.space()?;
        self.call("services", &space, |s| {
            Ok(s.services
                .iter()
                .filter(|((sp, _), _)| *sp == space)
                .map(|((_, name), svc)| ServiceRecord {
                    name: name.clone(),
                    last_operation: svc.last_operation.clone(),
                    bound_apps: svc.bound_apps.clone(),
                })
                .collect())
        })
    }

    async fn service(&self, name: &str) -> Result<ServiceRecord, PlatformError> {
        let key = self.key(name)?;
        self.call("service", name, |s| {
            let scripted = next_scripted(s.last_op_script.get_mut(name));
            let Some(svc) = s.services.get_mut(&key) else {
                return Err(PlatformError::NotFound(format!("service {name}")));
            };
            if scripted.is_some() {
                svc.last_operation = scripted;
            }
            Ok(ServiceRecord {
                name: name.to_string(),
                last_operation: svc.last_operation.clone(),
                bound_apps: svc.bound_apps.clone(),
            })
        })
    }

    async fn create_user_provided_service(
        &self,
        service: &UserProvidedService,
    ) -> Result<(), PlatformError> {
        let key = self.key(&service.name)?;
        self.call("create_user_provided_service", &service.name, |s| {
            if s.services.contains_key(&key) {
                return Err(PlatformError::Rejected(format!("service {} exists", service.name)));
            }
            s.services.insert(key, SimService::default());
            Ok(())
        })
    }

    async fn create_service(&self, service: &ManagedService) -> Result<(), PlatformError> {
        let key = self.key(&service.name)?;
        self.call("create_service", &service.name, |s| {
            if s.services.contains_key(&key) {
                return Err(PlatformError::Rejected(format!("service {} exists", service.name)));
            }
            s.services.insert(
                key,
                SimService {
                    last_operation: Some(LastOperation::new("create", OperationState::InProgress)),
                    bound_apps: Vec::new(),
                },
            );
            Ok(())
        })
    }

    async fn delete_service(&self, name: &str) -> Result<(), PlatformError> {
        let key = self.key(name)?;
        self.call("delete_service", name, |s| {
            s.services
                .remove(&key)
                .map(|_| ())
                .ok_or_else(|| PlatformError::NotFound(format!("service {name}")))
        })
    }

    async fn bind_service(&self, app: &str, service: &str) -> Result<(), PlatformError> {
        let app = app.to_string();
        self.service_call("bind_service", service, |svc| {
            if !svc.bound_apps.contains(&app) {
                svc.bound_apps.push(app);
            }
            Ok(())
        })
    }

    async fn unbind_service(&self, app: &str, service: &str) -> Result<(), PlatformError> {
        self.service_call("unbind_service", service, |svc| {
            svc.bound_apps.retain(|bound| bound != app);
            Ok(())
        })
    }

    // domains and routes

    async fn domains(&self) -> Result<Vec<String>, PlatformError> {
        self.call("domains", "", |s| Ok(s.domains.iter().cloned().collect()))
    }

    async fn add_domain(&self, domain: &str) -> Result<(), PlatformError> {
        self.call("add_domain", domain, |s| {
            s.domains.insert(cfa_common::normalize_domain(domain));
            Ok(())
        })
    }

    async fn delete_domain(&self, domain: &str) -> Result<(), PlatformError> {
        self.call("delete_domain", domain, |s| {
            if s.domains.remove(&cfa_common::normalize_domain(domain)) {
                Ok(())
            } else {
                Err(PlatformError::NotFound(format!("domain {domain}")))
            }
        })
    }

    async fn routes(&self) -> Result<Vec<RouteUri>, PlatformError> {
        let space = self.space()?;
        self.call("routes", &space, |s| {
            Ok(s.routes
                .iter()
                .filter(|(_, sp)| **sp == space)
                .map(|(route, _)| route.clone())
                .collect())
        })
    }

    async fn create_route(&self, route: &RouteUri) -> Result<(), PlatformError> {
        let space = self.space()?;
        self.call("create_route", &route.to_string(), |s| {
            if route.validate().is_err() {
                return Err(PlatformError::Server {
                    status: 400,
                    message: format!("host {} is not a valid DNS label", route.host),
                });
            }
            if s.rejected_routes.contains(route) || s.routes.contains_key(route) {
                return Err(PlatformError::Rejected(format!("host {} is taken", route.host)));
            }
            if !s.domains.contains(&route.domain) {
                return Err(PlatformError::NotFound(format!("domain {}", route.domain)));
            }
            s.routes.insert(route.clone(), space);
            Ok(())
        })
    }

    async fn delete_route(&self, route: &RouteUri) -> Result<(), PlatformError> {
        self.call("delete_route", &route.to_string(), |s| {
            if s.routes.remove(route).is_none() {
                return Err(PlatformError::NotFound(format!("route {route}")));
            }
            for app in s.apps.values_mut() {
                app.routes.retain(|r| r != route);
            }
            Ok(())
        })
    }

    // spaces

    async fn spaces(&self) -> Result<Vec<String>, PlatformError> {
        self.call("spaces", "", |s| Ok(s.spaces.iter().cloned().collect()))
    }

    async fn create_space(&self, name: &str) -> Result<(), PlatformError> {
        self.call("create_space", name, |s| {
            if s.spaces.insert(name.to_string()) {
                Ok(())
            } else {
                Err(PlatformError::Rejected(format!("space {name} exists")))
            }
        })
    }

    async fn delete_space(&self, name: &str) -> Result<(), PlatformError> {
        self.call("delete_space", name, |s| {
            if s.spaces.remove(name) {
                Ok(())
            } else {
                Err(PlatformError::NotFound(format!("space {name}")))
            }
        })
    }

    async fn associate_role(
        &self,
        space: &str,
        user: &str,
        role: SpaceRole,
    ) -> Result<(), PlatformError> {
        self.call("associate_role", &format!("{space} {role}"), |s| {
            if !s.spaces.contains(space) {
                return Err(PlatformError::NotFound(format!("space {space}")));
            }
            s.roles.push((space.to_string(), user.to_string(), role));
            Ok(())
        })
    }
}
