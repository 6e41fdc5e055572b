//! Domain and route operations of the gateway.

use cfa_common::normalize_domain;
use tracing::{info, warn};

use super::CfGateway;
use crate::application::ports::{ControlPlane, DeriveRoute, PlatformSession, RouteGateway};
use crate::application::services::retry::{self, RetryError};
use crate::domain::{ActivationError, PlatformError, ResourceKind, RouteUri};

impl<P: ControlPlane, A> RouteGateway for CfGateway<P, A> {
    async fn domain_exists(&self, domain: &str) -> Result<bool, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Domain, domain, action);
        let session = self.open(None).await.map_err(fault("inspect"))?;
        let wanted = normalize_domain(domain);
        let domains = session.domains().await.map_err(fault("inspect"))?;
        Ok(domains.iter().any(|d| normalize_domain(d) == wanted))
    }

    /// Register the domain, then re-read the org domain list: the platform
    /// accepts a name another organization already owns without attaching
    /// it here.
    async fn add_domain(&self, domain: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Domain, domain, action);
        let session = self.open(None).await.map_err(fault("register"))?;
        let wanted = normalize_domain(domain);
        session.add_domain(&wanted).await.map_err(fault("register"))?;

        let domains = session.domains().await.map_err(fault("register"))?;
        if !domains.iter().any(|d| normalize_domain(d) == wanted) {
            return Err(ActivationError::UnexpectedState {
                kind: ResourceKind::Domain,
                name: wanted,
                action: "register",
                actual: "missing from the organization (reserved concurrently elsewhere?)"
                    .to_string(),
            });
        }
        info!(domain = %wanted, "domain registered");
        Ok(())
    }

    async fn delete_domain(&self, domain: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Domain, domain, action);
        let session = self.open(None).await.map_err(fault("delete"))?;
        match session.delete_domain(&normalize_domain(domain)).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(domain = %domain, "domain already gone");
                Ok(())
            }
            Err(err) => Err(fault("delete")(err)),
        }
    }

    async fn route_exists(&self, space: &str, route: &RouteUri) -> Result<bool, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Route, route.to_string(), action);
        let session = self.open(Some(space)).await.map_err(fault("inspect"))?;
        let routes = session.routes().await.map_err(fault("inspect"))?;
        Ok(routes.iter().any(|r| r.matches(route)))
    }

    async fn create_route(
        &self,
        space: &str,
        route: &RouteUri,
        derive: DeriveRoute<'_>,
    ) -> Result<RouteUri, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Route, route.to_string(), action);
        let session = self.open(Some(space)).await.map_err(fault("create"))?;
        let session = &session;

        let result = retry::with_candidates(
            self.settings.route_retry_attempts,
            route,
            derive,
            |candidate: RouteUri| async move {
                session.create_route(&candidate).await?;
                Ok::<_, PlatformError>(candidate)
            },
            PlatformError::is_name_conflict,
        )
        .await;

        match result {
            Ok(created) => {
                info!(route = %created, space = %space, "route registered");
                Ok(created)
            }
            Err(RetryError::Exhausted { attempts, last }) => Err(ActivationError::RetriesExhausted {
                kind: ResourceKind::Route,
                requested: route.to_string(),
                action: "create",
                attempts,
                last: Box::new(last),
            }),
            Err(RetryError::Fatal(err)) => Err(fault("create")(err)),
        }
    }

    async fn delete_route(&self, space: &str, route: &RouteUri) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Route, route.to_string(), action);
        let session = self.open(Some(space)).await.map_err(fault("delete"))?;
        match session.delete_route(route).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(route = %route, "route already gone");
                Ok(())
            }
            Err(err) => Err(fault("delete")(err)),
        }
    }
}
