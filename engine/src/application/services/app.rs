//! App activation use-cases: activate, start, stop, delete.
//!
//! Imports only from `crate::domain`, `cfa_common` and `crate::application::ports`.

use cfa_common::{AppStartTask, TaskStatus};
use tracing::{info, warn};

use crate::application::ports::{AppInspector, AppLifecycle, Clock};
use crate::domain::{ActivationError, App, AppState, DeleteOutcome};

/// Outcome of [`start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The app was already started. The snapshot is terminal and succeeded.
    AlreadyStarted(TaskStatus<AppStartTask>),
    /// A start was issued. Poll the snapshot until it is terminal.
    Starting(TaskStatus<AppStartTask>),
}

impl StartOutcome {
    #[must_use]
    pub fn status(&self) -> &TaskStatus<AppStartTask> {
        match self {
            Self::AlreadyStarted(status) | Self::Starting(status) => status,
        }
    }

    #[must_use]
    pub fn into_status(self) -> TaskStatus<AppStartTask> {
        match self {
            Self::AlreadyStarted(status) | Self::Starting(status) => status,
        }
    }
}

/// Outcome of [`stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Stopped already, or absent.
    AlreadyStopped,
}

/// Create the app on the platform. Returns its GUID.
///
/// No existence pre-check: a name collision surfaces as a creation fault.
///
/// # Errors
///
/// Returns an error if the descriptor is invalid or any creation step fails.
pub async fn activate(gateway: &impl AppLifecycle, app: &App) -> Result<String, ActivationError> {
    app.validate()?;
    info!(app = %app.name, space = %app.space, instances = app.instance_count, "activating app");
    let guid = gateway.create_app(app).await?;
    info!(app = %app.name, guid = %guid, "app activated");
    Ok(guid)
}

/// Start the app unless it already runs, and return the snapshot to poll.
///
/// # Errors
///
/// Returns an error if the state query or the start sequence fails.
pub async fn start(
    gateway: &(impl AppLifecycle + AppInspector),
    clock: &impl Clock,
    app: &App,
) -> Result<StartOutcome, ActivationError> {
    let now = clock.now();
    let mut status = TaskStatus::new(format!("starting app <{}>", app.name), now).with_subtask(
        AppStartTask::new(&app.name, &app.space, app.instance_count, now),
    );

    if gateway.app_state(&app.space, &app.name).await? == Some(AppState::Started) {
        info!(app = %app.name, space = %app.space, "app already started, skipping start");
        for subtask in &mut status.subtasks {
            subtask.progress.succeed(now);
        }
        status.progress.succeed(now);
        return Ok(StartOutcome::AlreadyStarted(status));
    }

    gateway
        .start_app(&app.space, &app.name, app.instance_count)
        .await?;
    info!(app = %app.name, space = %app.space, "app start issued");
    Ok(StartOutcome::Starting(status))
}

/// Stop the app if it runs. Stopping an absent app is a no-op.
///
/// # Errors
///
/// Returns an error if the state query or the stop fails.
pub async fn stop(
    gateway: &(impl AppLifecycle + AppInspector),
    space: &str,
    name: &str,
) -> Result<StopOutcome, ActivationError> {
    match gateway.app_state(space, name).await? {
        None => {
            warn!(app = %name, space = %space, "app not found, nothing to stop");
            Ok(StopOutcome::AlreadyStopped)
        }
        Some(AppState::Stopped) => {
            info!(app = %name, space = %space, "app already stopped");
            Ok(StopOutcome::AlreadyStopped)
        }
        Some(_) => {
            gateway.stop_app(space, name).await?;
            info!(app = %name, space = %space, "app stopped");
            Ok(StopOutcome::Stopped)
        }
    }
}

/// Delete the app, dumping its diagnostics first. Absent apps are skipped.
///
/// # Errors
///
/// Returns an error if the existence check or the delete fails.
pub async fn delete(
    gateway: &(impl AppLifecycle + AppInspector),
    space: &str,
    name: &str,
) -> Result<DeleteOutcome, ActivationError> {
    if !gateway.app_exists(space, name).await? {
        warn!(app = %name, space = %space, "app not found, skipping delete");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    gateway.log_app_diagnostics(space, name).await;
    gateway.delete_app(space, name).await?;
    info!(app = %name, space = %space, "app deleted");
    Ok(DeleteOutcome::Deleted)
}
