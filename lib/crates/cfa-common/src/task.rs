//! Task snapshot model shared between the polling engine and its callers.
//!
//! Snapshots are plain values. The engine reads one and returns a new one;
//! callers persist whatever they get back and hand it in on the next poll.
//! Nothing here derives a parent's state from its subtasks: completion of a
//! parent is decided by whoever owns the policy for that task.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single task node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// `Succeeded` and `Failed` are terminal: no further poll changes them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Pending => "---",
            Self::Running => "RUN",
            Self::Succeeded => "+OK",
            Self::Failed => "*KO",
        }
    }
}

/// Status fields carried by every node of a task tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub description: String,
    /// Completion between 0 and 100.
    pub percent: u8,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn pending(description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            percent: 0,
            state: TaskState::Pending,
            failure: None,
            started_at: now,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn has_succeeded(&self) -> bool {
        self.state == TaskState::Succeeded
    }

    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.state == TaskState::Failed
    }

    /// Record partial completion. Terminal nodes are left untouched.
    pub fn report(&mut self, percent: u8) {
        if self.is_terminal() {
            return;
        }
        self.percent = percent.min(100);
        self.state = TaskState::Running;
    }

    pub fn succeed(&mut self, now: DateTime<Utc>) {
        self.percent = 100;
        self.state = TaskState::Succeeded;
        self.failure = None;
        self.ended_at = Some(now);
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.state = TaskState::Failed;
        self.failure = Some(message.into());
        self.ended_at = Some(now);
    }
}

/// Access to the status fields of a subtask type.
pub trait HasProgress {
    fn progress(&self) -> &Progress;
}

/// A task with an ordered list of homogeneous subtasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatus<S> {
    #[serde(flatten)]
    pub progress: Progress,
    pub subtasks: Vec<S>,
}

impl<S> TaskStatus<S> {
    pub fn new(description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            progress: Progress::pending(description, now),
            subtasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subtask(mut self, subtask: S) -> Self {
        self.subtasks.push(subtask);
        self
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress.is_terminal()
    }
}

impl<S: HasProgress> TaskStatus<S> {
    /// Mean completion of the subtasks, `None` when there are none.
    #[must_use]
    pub fn subtask_percent(&self) -> Option<u8> {
        if self.subtasks.is_empty() {
            return None;
        }
        let total: usize = self
            .subtasks
            .iter()
            .map(|s| usize::from(s.progress().percent))
            .sum();
        u8::try_from(total / self.subtasks.len()).ok()
    }

    #[must_use]
    pub fn all_subtasks_succeeded(&self) -> bool {
        self.subtasks.iter().all(|s| s.progress().has_succeeded())
    }

    /// Failure message of the first failed subtask, in order.
    #[must_use]
    pub fn first_failure(&self) -> Option<&str> {
        self.subtasks
            .iter()
            .map(HasProgress::progress)
            .find(|p| p.has_failed())
            .map(|p| p.failure.as_deref().unwrap_or("failed"))
    }
}

impl<S: HasProgress> fmt::Display for TaskStatus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, &self.progress, 0)?;
        for subtask in &self.subtasks {
            writeln!(f)?;
            write_node(f, subtask.progress(), 3)?;
        }
        Ok(())
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, p: &Progress, indent: usize) -> fmt::Result {
    write!(
        f,
        "{:indent$}[{:>3}%] ({}) {}",
        "",
        p.percent,
        p.state.tag(),
        p.description
    )?;
    if let Some(failure) = &p.failure {
        write!(f, " ** {failure}")?;
    }
    Ok(())
}

// ── Polled subtasks ──────────────────────────────────────────────────────────

/// Tracks the instances of one app until they all report running.
///
/// `first_poll_at` is the reference point for the start timeout. A failed
/// instance read counts as zero running, but the reported percent keeps the
/// highest reading seen so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppStartTask {
    #[serde(flatten)]
    pub progress: Progress,
    pub app_name: String,
    pub space: String,
    pub instance_count: u32,
    #[serde(default)]
    pub polls: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_poll_at: Option<DateTime<Utc>>,
}

impl AppStartTask {
    pub fn new(
        app_name: impl Into<String>,
        space: impl Into<String>,
        instance_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let app_name = app_name.into();
        Self {
            progress: Progress::pending(format!("waiting for instances of app <{app_name}>"), now),
            app_name,
            space: space.into(),
            instance_count,
            polls: 0,
            first_poll_at: None,
        }
    }
}

impl HasProgress for AppStartTask {
    fn progress(&self) -> &Progress {
        &self.progress
    }
}

/// Tracks the last operation of a managed service instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceProvisionTask {
    #[serde(flatten)]
    pub progress: Progress,
    pub service_name: String,
    pub space: String,
    #[serde(default)]
    pub polls: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_poll_at: Option<DateTime<Utc>>,
}

impl ServiceProvisionTask {
    pub fn new(service_name: impl Into<String>, space: impl Into<String>, now: DateTime<Utc>) -> Self {
        let service_name = service_name.into();
        Self {
            progress: Progress::pending(format!("last operation of service <{service_name}>"), now),
            service_name,
            space: space.into(),
            polls: 0,
            first_poll_at: None,
        }
    }
}

impl HasProgress for ServiceProvisionTask {
    fn progress(&self) -> &Progress {
        &self.progress
    }
}
