//! Route and domain activation use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use cfa_common::normalize_domain;
use tracing::{info, warn};

use crate::application::ports::RouteGateway;
use crate::domain::{ActivationError, DeleteOutcome, ResourceKind, RouteUri};

/// Create the route, registering its domain first when the platform does
/// not know it. Returns the route actually created, which differs from the
/// requested one when the name had to be disambiguated.
///
/// # Errors
///
/// [`ActivationError::AlreadyExists`] if the exact route exists,
/// [`ActivationError::RetriesExhausted`] if every candidate was rejected.
pub async fn activate(
    gateway: &impl RouteGateway,
    space: &str,
    route: &RouteUri,
) -> Result<RouteUri, ActivationError> {
    route.validate()?;
    ensure_domain(gateway, &route.domain).await?;

    if gateway.route_exists(space, route).await? {
        return Err(ActivationError::AlreadyExists {
            kind: ResourceKind::Route,
            name: route.to_string(),
            scope: space.to_string(),
        });
    }

    let created = gateway
        .create_route(space, route, &|original: &RouteUri, attempt: u32| original.candidate(attempt))
        .await?;
    if created == *route {
        info!(route = %created, space = %space, "route created");
    } else {
        warn!(requested = %route, route = %created, space = %space, "route created under an alternate name");
    }
    Ok(created)
}

/// Delete the route. Its domain is left alone.
///
/// # Errors
///
/// Returns an error if the existence check or the delete fails.
pub async fn delete(
    gateway: &impl RouteGateway,
    space: &str,
    route: &RouteUri,
) -> Result<DeleteOutcome, ActivationError> {
    if !gateway.route_exists(space, route).await? {
        warn!(route = %route, space = %space, "route not found, skipping delete");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    gateway.delete_route(space, route).await?;
    info!(route = %route, space = %space, "route deleted");
    Ok(DeleteOutcome::Deleted)
}

/// Register the domain with the organization.
///
/// # Errors
///
/// [`ActivationError::AlreadyExists`] if the organization already has it.
pub async fn activate_domain(
    gateway: &impl RouteGateway,
    domain: &str,
) -> Result<(), ActivationError> {
    let domain = normalize_domain(domain);
    if gateway.domain_exists(&domain).await? {
        return Err(ActivationError::AlreadyExists {
            kind: ResourceKind::Domain,
            name: domain,
            scope: "organization".to_string(),
        });
    }
    gateway.add_domain(&domain).await?;
    info!(domain = %domain, "domain registered");
    Ok(())
}

/// Remove the domain from the organization. Absent domains are skipped.
///
/// # Errors
///
/// Returns an error if the existence check or the delete fails.
pub async fn delete_domain(
    gateway: &impl RouteGateway,
    domain: &str,
) -> Result<DeleteOutcome, ActivationError> {
    let domain = normalize_domain(domain);
    if !gateway.domain_exists(&domain).await? {
        warn!(domain = %domain, "domain not found, skipping delete");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    gateway.delete_domain(&domain).await?;
    info!(domain = %domain, "domain deleted");
    Ok(DeleteOutcome::Deleted)
}

async fn ensure_domain(gateway: &impl RouteGateway, domain: &str) -> Result<(), ActivationError> {
    if gateway.domain_exists(domain).await? {
        return Ok(());
    }
    info!(domain = %domain, "domain unknown to the platform, registering it");
    gateway.add_domain(domain).await
}
