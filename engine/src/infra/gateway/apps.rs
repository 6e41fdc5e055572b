//! App operations of the gateway.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cfa_common::normalize_domain;
use tracing::{debug, error, info, warn};

use super::{CfGateway, Session};
use crate::application::ports::{
    AppInspector, AppLifecycle, ArtifactSource, ControlPlane, CreateAppRequest, InstanceInfo,
    PlatformSession, Staging,
};
use crate::domain::app::HEALTH_CHECK_TIMEOUT_SECS;
use crate::domain::{
    ActivationError, App, AppState, InstanceState, PlatformError, ResourceKind,
};
use crate::infra::artifact::{DefaultBundle, synthesize_default};

/// Always set so staging logs carry buildpack details.
const BUILDPACK_LOG_LEVEL: (&str, &str) = ("JBP_LOG_LEVEL", "DEBUG");

/// Bundle to upload: a resolved artifact, or a placeholder kept alive until
/// the upload is done.
enum Bundle {
    Resolved(PathBuf),
    Synthesized(DefaultBundle),
}

impl Bundle {
    fn path(&self) -> &std::path::Path {
        match self {
            Self::Resolved(path) => path,
            Self::Synthesized(bundle) => bundle.path(),
        }
    }
}

impl<P: ControlPlane, A: ArtifactSource> CfGateway<P, A> {
    async fn bundle_for(&self, app: &App) -> Result<Bundle, ActivationError> {
        let unavailable = |source: anyhow::Error| ActivationError::ArtifactUnavailable {
            app: app.name.clone(),
            source,
        };
        match &app.binaries {
            Some(binaries) if binaries.access_url.is_none() && app.optional_binaries => {
                info!(app = %app.name, artifact = %binaries.coordinates, "binaries not published, using a default bundle");
                synthesize_default(&app.name, &binaries.extension)
                    .map(Bundle::Synthesized)
                    .map_err(unavailable)
            }
            Some(binaries) => self
                .artifacts
                .resolve(binaries)
                .await
                .map(Bundle::Resolved)
                .map_err(unavailable),
            None if app.optional_binaries => synthesize_default(&app.name, "war")
                .map(Bundle::Synthesized)
                .map_err(unavailable),
            None => Err(unavailable(anyhow::anyhow!("no binaries declared"))),
        }
    }
}

impl<P: ControlPlane, A: ArtifactSource> AppLifecycle for CfGateway<P, A> {
    async fn create_app(&self, app: &App) -> Result<String, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::App, &app.name, action);
        let session = self.open(Some(&app.space)).await.map_err(fault("create"))?;

        let request = CreateAppRequest {
            name: app.name.clone(),
            staging: Staging {
                buildpack_url: app.buildpack_url.clone(),
                stack: app.stack.clone(),
                health_check_timeout_secs: HEALTH_CHECK_TIMEOUT_SECS,
            },
            disk_mb: app.disk_mb,
            ram_mb: app.ram_mb,
            uris: app.routes.iter().map(ToString::to_string).collect(),
            services: app.services.clone(),
        };
        let guid = session.create_app(&request).await.map_err(fault("create"))?;
        debug!(app = %app.name, guid = %guid, "app registered");

        if app.instance_count > 1 {
            session
                .scale_instances(&app.name, app.instance_count)
                .await
                .map_err(fault("scale"))?;
        }

        let mut env = BTreeMap::from([(
            BUILDPACK_LOG_LEVEL.0.to_string(),
            BUILDPACK_LOG_LEVEL.1.to_string(),
        )]);
        env.extend(app.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        session
            .update_env(&app.name, &env)
            .await
            .map_err(fault("configure"))?;

        let bundle = self.bundle_for(app).await?;
        session
            .upload_bits(&app.name, bundle.path())
            .await
            .map_err(fault("upload binaries of"))?;

        info!(app = %app.name, guid = %guid, space = %app.space, "app created");
        Ok(guid)
    }

    async fn start_app(
        &self,
        space: &str,
        name: &str,
        instances: u32,
    ) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::App, name, action);
        let session = self.open(Some(space)).await.map_err(fault("start"))?;

        session.start_app(name).await.map_err(fault("start"))?;
        let mut record = session.app(name).await.map_err(fault("start"))?;
        log_staging(&*session, name).await;

        if instances > 1 {
            session
                .scale_instances(name, instances)
                .await
                .map_err(fault("scale"))?;
            record = session.app(name).await.map_err(fault("scale"))?;
            if record.instances != instances {
                error!(
                    app = %name,
                    requested = instances,
                    reported = record.instances,
                    "instance count mismatch after scaling"
                );
            }
        }

        if record.state != AppState::Started {
            return Err(ActivationError::UnexpectedState {
                kind: ResourceKind::App,
                name: name.to_string(),
                action: "start",
                actual: record.state.to_string(),
            });
        }
        Ok(())
    }

    async fn stop_app(&self, space: &str, name: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::App, name, action);
        let session = self.open(Some(space)).await.map_err(fault("stop"))?;

        session.stop_app(name).await.map_err(fault("stop"))?;
        let record = session.app(name).await.map_err(fault("stop"))?;
        if record.state != AppState::Stopped {
            return Err(ActivationError::UnexpectedState {
                kind: ResourceKind::App,
                name: name.to_string(),
                action: "stop",
                actual: record.state.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_app(&self, space: &str, name: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::App, name, action);
        let session = self.open(Some(space)).await.map_err(fault("delete"))?;

        let routes = session.app_routes(name).await.unwrap_or_else(|err| {
            warn!(app = %name, error = %err, "cannot list app routes, deleting app only");
            Vec::new()
        });

        let mut private_domains: Vec<String> = Vec::new();
        for route in &routes {
            match session.delete_route(route).await {
                Ok(()) => info!(app = %name, route = %route, "route deleted"),
                Err(err) => warn!(app = %name, route = %route, error = %err, "unable to delete route, continuing"),
            }
            let domain = normalize_domain(&route.domain);
            if domain != self.settings.shared_domain && !private_domains.contains(&domain) {
                private_domains.push(domain);
            }
        }
        for domain in &private_domains {
            match session.delete_domain(domain).await {
                Ok(()) => info!(app = %name, domain = %domain, "private domain deleted"),
                Err(err) => warn!(app = %name, domain = %domain, error = %err, "unable to delete domain, continuing"),
            }
        }

        match session.delete_app(name).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(app = %name, "app already gone");
                Ok(())
            }
            Err(err) => Err(fault("delete")(err)),
        }
    }
}

impl<P: ControlPlane, A: ArtifactSource> AppInspector for CfGateway<P, A> {
    async fn app_exists(&self, space: &str, name: &str) -> Result<bool, ActivationError> {
        Ok(self.app_state(space, name).await?.is_some())
    }

    async fn app_state(&self, space: &str, name: &str) -> Result<Option<AppState>, ActivationError> {
        let fault = ActivationError::platform(ResourceKind::App, name, "inspect");
        let session = self.open(Some(space)).await.map_err(fault)?;
        match session.app(name).await {
            Ok(record) => Ok(Some(record.state)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(ActivationError::platform(ResourceKind::App, name, "inspect")(err)),
        }
    }

    async fn count_running_instances(
        &self,
        space: &str,
        name: &str,
        expected: u32,
    ) -> Result<u32, ActivationError> {
        let session = match self.open(Some(space)).await {
            Ok(session) => session,
            Err(err) => {
                warn!(app = %name, error = %err, "cannot log in to read instances, counting none");
                return Ok(0);
            }
        };
        let read = self.read_instances(&session, name);
        match tokio::time::timeout(self.settings.instance_info_timeout, read).await {
            Err(_) => {
                warn!(
                    app = %name,
                    timeout_secs = self.settings.instance_info_timeout.as_secs(),
                    "instance info read timed out, counting none"
                );
                Ok(0)
            }
            Ok(Err(err @ PlatformError::StagingFailed(_))) => {
                Err(ActivationError::platform(ResourceKind::App, name, "stage")(err))
            }
            Ok(Err(err)) => {
                debug!(app = %name, error = %err, "instances not readable yet, counting none");
                Ok(0)
            }
            Ok(Ok(instances)) => {
                let running = instances
                    .iter()
                    .filter(|i| i.state == InstanceState::Running)
                    .count();
                let running = u32::try_from(running).unwrap_or(u32::MAX);
                debug!(app = %name, running, expected, "app instances read");
                Ok(running)
            }
        }
    }

    async fn log_app_diagnostics(&self, space: &str, name: &str) {
        let session = match self.open(Some(space)).await {
            Ok(session) => session,
            Err(err) => {
                warn!(app = %name, error = %err, "cannot log in to collect diagnostics");
                return;
            }
        };
        match session.recent_logs(name).await {
            Ok(lines) => {
                for line in lines {
                    info!(app = %name, "recent log: {line}");
                }
            }
            Err(err) => warn!(app = %name, error = %err, "cannot fetch recent logs"),
        }
        log_staging(&*session, name).await;
        match session.app_stats(name).await {
            Ok(stats) => match serde_json::to_string(&stats) {
                Ok(json) => info!(app = %name, stats = %json, "instance stats"),
                Err(err) => warn!(app = %name, error = %err, "cannot serialize instance stats"),
            },
            Err(err) => warn!(app = %name, error = %err, "cannot fetch instance stats"),
        }
    }
}

impl<P: ControlPlane, A> CfGateway<P, A> {
    /// Read instances, retrying server errors at the configured interval.
    /// The caller bounds the whole read.
    async fn read_instances(
        &self,
        session: &Session<P::Session>,
        name: &str,
    ) -> Result<Vec<InstanceInfo>, PlatformError> {
        loop {
            match session.app_instances(name).await {
                Err(err) if err.is_server_error() => {
                    debug!(app = %name, error = %err, "server error reading instances, retrying");
                    tokio::time::sleep(self.settings.instance_retry_interval).await;
                }
                other => return other,
            }
        }
    }
}

async fn log_staging<S: PlatformSession>(session: &S, name: &str) {
    match session.staging_logs(name).await {
        Ok(lines) => {
            for line in lines {
                debug!(app = %name, "staging: {line}");
            }
        }
        Err(err) => debug!(app = %name, error = %err, "no staging logs"),
    }
}
