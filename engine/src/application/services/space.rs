//! Space activation use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tracing::{info, warn};

use crate::application::ports::SpaceGateway;
use crate::application::services::retry::{self, RetryError};
use crate::domain::{
    ActivationError, CREATOR_ROLES, DeleteOutcome, ResourceKind, candidate_name,
    validate_space_name,
};

/// Attempts made by [`reserve_name`] before giving up.
pub const NAME_RESERVATION_ATTEMPTS: u32 = 5;

/// Create the space and grant the manager, auditor and developer roles.
///
/// A failing role grant leaves the space in place with the roles granted so
/// far; nothing is rolled back.
///
/// # Errors
///
/// [`ActivationError::AlreadyExists`] if the space exists, or the first
/// failing gateway call.
pub async fn activate(gateway: &impl SpaceGateway, name: &str) -> Result<(), ActivationError> {
    validate_space_name(name)?;
    if gateway.space_exists(name).await? {
        return Err(ActivationError::AlreadyExists {
            kind: ResourceKind::Space,
            name: name.to_string(),
            scope: "organization".to_string(),
        });
    }
    gateway.create_space(name).await?;
    info!(space = %name, "space created");
    for role in CREATOR_ROLES {
        gateway.associate_role(name, role).await?;
        info!(space = %name, role = %role, "space role granted");
    }
    Ok(())
}

/// Delete the space. Absent spaces are skipped.
///
/// # Errors
///
/// Returns an error if the existence check or the delete fails.
pub async fn delete(gateway: &impl SpaceGateway, name: &str) -> Result<DeleteOutcome, ActivationError> {
    if !gateway.space_exists(name).await? {
        warn!(space = %name, "space not found, skipping delete");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    gateway.delete_space(name).await?;
    info!(space = %name, "space deleted");
    Ok(DeleteOutcome::Deleted)
}

/// First free name among `label`, `label-1`, `label-2`, …
///
/// Only probes; nothing is created, so a concurrent caller may still take
/// the name before [`activate`] runs.
///
/// # Errors
///
/// [`ActivationError::RetriesExhausted`] when every candidate is taken.
pub async fn reserve_name(gateway: &impl SpaceGateway, label: &str) -> Result<String, ActivationError> {
    let probe = |candidate: String| async move {
        validate_space_name(&candidate)?;
        if gateway.space_exists(&candidate).await? {
            Err(ActivationError::AlreadyExists {
                kind: ResourceKind::Space,
                name: candidate,
                scope: "organization".to_string(),
            })
        } else {
            Ok(candidate)
        }
    };
    let result = retry::with_candidates(
        NAME_RESERVATION_ATTEMPTS,
        &label.to_string(),
        |original: &String, attempt: u32| candidate_name(original, attempt),
        probe,
        ActivationError::is_already_exists,
    )
    .await;
    match result {
        Ok(name) => {
            info!(label = %label, space = %name, "free space name found");
            Ok(name)
        }
        Err(RetryError::Exhausted { attempts, last }) => Err(ActivationError::RetriesExhausted {
            kind: ResourceKind::Space,
            requested: label.to_string(),
            action: "reserve",
            attempts,
            last: Box::new(last),
        }),
        Err(RetryError::Fatal(err)) => Err(err),
    }
}
