//! Service activation use-cases: provision, delete, bind, unbind.
//!
//! Imports only from `crate::domain`, `cfa_common` and `crate::application::ports`.

use cfa_common::{ServiceProvisionTask, TaskStatus};
use tracing::{info, warn};

use crate::application::ports::{Clock, ServiceGateway};
use crate::domain::{ActivationError, DeleteOutcome, ResourceKind, Service};

/// Outcome of [`bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    AlreadyBound,
}

/// Outcome of [`unbind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbindOutcome {
    Unbound,
    NotBound,
}

/// Create the service and return a snapshot tracking its provisioning.
///
/// User-provided services are ready at once, so their snapshot is already
/// terminal. Managed services return a pending snapshot to poll.
///
/// # Errors
///
/// [`ActivationError::AlreadyExists`] if an instance with that name exists,
/// or the gateway fault if creation fails.
pub async fn activate(
    gateway: &impl ServiceGateway,
    clock: &impl Clock,
    service: &Service,
) -> Result<TaskStatus<ServiceProvisionTask>, ActivationError> {
    service.validate()?;
    let (name, space) = (service.name(), service.space());
    if gateway.service_exists(space, name).await? {
        return Err(ActivationError::AlreadyExists {
            kind: ResourceKind::Service,
            name: name.to_string(),
            scope: space.to_string(),
        });
    }

    let now = clock.now();
    let mut status = tracking_status(format!("creating service <{name}>"), space, name, now);
    match service {
        Service::UserProvided(ups) => {
            gateway.create_user_provided_service(ups).await?;
            for subtask in &mut status.subtasks {
                subtask.progress.succeed(now);
            }
            status.progress.succeed(now);
            info!(service = %name, space = %space, "user-provided service created");
        }
        Service::Managed(managed) => {
            gateway.create_managed_service(managed).await?;
            info!(
                service = %name,
                space = %space,
                label = %managed.label,
                plan = %managed.plan,
                "managed service requested"
            );
        }
    }
    Ok(status)
}

/// Delete the service instance. Absent instances are skipped.
///
/// Brokers may tear managed instances down asynchronously; poll
/// [`deletion_status`] to follow that.
///
/// # Errors
///
/// Returns an error if the existence check or the delete fails.
pub async fn delete(
    gateway: &impl ServiceGateway,
    space: &str,
    name: &str,
) -> Result<DeleteOutcome, ActivationError> {
    if !gateway.service_exists(space, name).await? {
        warn!(service = %name, space = %space, "service not found, skipping delete");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    gateway.delete_service(space, name).await?;
    info!(service = %name, space = %space, "service delete requested");
    Ok(DeleteOutcome::Deleted)
}

/// Pending snapshot following the teardown of a managed instance.
pub fn deletion_status(
    clock: &impl Clock,
    space: &str,
    name: &str,
) -> TaskStatus<ServiceProvisionTask> {
    tracking_status(format!("deleting service <{name}>"), space, name, clock.now())
}

/// Delete every service instance of the space. Returns how many were deleted.
///
/// # Errors
///
/// Stops at the first failing delete.
pub async fn delete_all(gateway: &impl ServiceGateway, space: &str) -> Result<usize, ActivationError> {
    let names = gateway.list_services(space).await?;
    for name in &names {
        gateway.delete_service(space, name).await?;
        info!(service = %name, space = %space, "service deleted");
    }
    Ok(names.len())
}

/// Bind the service to the app unless already bound.
///
/// # Errors
///
/// Returns an error if the binding check or the bind fails.
pub async fn bind(
    gateway: &impl ServiceGateway,
    space: &str,
    app: &str,
    service: &str,
) -> Result<BindOutcome, ActivationError> {
    if gateway.is_service_bound(space, app, service).await? {
        info!(app = %app, service = %service, "service already bound");
        return Ok(BindOutcome::AlreadyBound);
    }
    gateway.bind_service(space, app, service).await?;
    info!(app = %app, service = %service, "service bound");
    Ok(BindOutcome::Bound)
}

/// Unbind the service from the app if bound.
///
/// # Errors
///
/// Returns an error if the binding check or the unbind fails.
pub async fn unbind(
    gateway: &impl ServiceGateway,
    space: &str,
    app: &str,
    service: &str,
) -> Result<UnbindOutcome, ActivationError> {
    if !gateway.is_service_bound(space, app, service).await? {
        warn!(app = %app, service = %service, "service not bound, skipping unbind");
        return Ok(UnbindOutcome::NotBound);
    }
    gateway.unbind_service(space, app, service).await?;
    info!(app = %app, service = %service, "service unbound");
    Ok(UnbindOutcome::Unbound)
}

fn tracking_status(
    description: String,
    space: &str,
    name: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> TaskStatus<ServiceProvisionTask> {
    TaskStatus::new(description, now).with_subtask(ServiceProvisionTask::new(name, space, now))
}
