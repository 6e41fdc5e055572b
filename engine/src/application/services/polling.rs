//! Status polling: advance a task snapshot by exactly one poll.
//!
//! The poller never sleeps. Callers decide the cadence, persist the snapshot
//! they get back and hand it in again on the next tick. Each call builds a
//! fresh snapshot; the input is only read.
//!
//! Imports only from `crate::domain`, `cfa_common` and `crate::application::ports`.

use std::time::Duration;

use cfa_common::{AppStartTask, HasProgress, PlatformConfig, ServiceProvisionTask, TaskStatus};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::application::ports::{AppInspector, Clock, ServiceGateway};
use crate::domain::OperationState;

/// Budgets after which a non-terminal subtask is failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeouts {
    pub app_start: Duration,
    pub service: Duration,
}

impl Default for PollTimeouts {
    fn default() -> Self {
        Self {
            app_start: Duration::from_secs(600),
            service: Duration::from_secs(600),
        }
    }
}

impl From<&PlatformConfig> for PollTimeouts {
    fn from(config: &PlatformConfig) -> Self {
        Self {
            app_start: config.app_start_timeout(),
            service: config.service_timeout(),
        }
    }
}

/// What a probe knows about the current tick.
#[derive(Debug, Clone, Copy)]
pub struct PollContext {
    pub now: DateTime<Utc>,
    pub timeouts: PollTimeouts,
}

/// One poll of one subtask kind against the gateway `G`.
///
/// Implementations return a new subtask built from `self`; they never touch
/// terminal subtasks (the poller does not call them for those).
#[allow(async_fn_in_trait)]
pub trait Probe<G>: Sized {
    async fn probe(&self, gateway: &G, ctx: &PollContext) -> Self;
}

/// Advances task snapshots against a gateway and a clock.
pub struct StatusPoller<'a, G, C> {
    gateway: &'a G,
    clock: &'a C,
    timeouts: PollTimeouts,
}

impl<'a, G, C: Clock> StatusPoller<'a, G, C> {
    pub fn new(gateway: &'a G, clock: &'a C, timeouts: PollTimeouts) -> Self {
        Self {
            gateway,
            clock,
            timeouts,
        }
    }

    /// Poll every non-terminal subtask once and settle the parent.
    ///
    /// A terminal snapshot is returned unchanged (as a copy) without any
    /// gateway call.
    pub async fn advance<S>(&self, previous: &TaskStatus<S>) -> TaskStatus<S>
    where
        S: Probe<G> + HasProgress + Clone,
    {
        if previous.is_complete() {
            return previous.clone();
        }
        let ctx = PollContext {
            now: self.clock.now(),
            timeouts: self.timeouts,
        };
        let mut subtasks = Vec::with_capacity(previous.subtasks.len());
        for subtask in &previous.subtasks {
            if subtask.progress().is_terminal() {
                subtasks.push(subtask.clone());
            } else {
                subtasks.push(subtask.probe(self.gateway, &ctx).await);
            }
        }
        let mut next = TaskStatus {
            progress: previous.progress.clone(),
            subtasks,
        };
        settle(&mut next, ctx.now);
        debug!(task = %next, "task snapshot advanced");
        next
    }
}

/// Parent policy: any failed subtask fails the parent, all succeeded
/// succeeds it, otherwise it runs at the mean subtask percent.
fn settle<S: HasProgress>(status: &mut TaskStatus<S>, now: DateTime<Utc>) {
    let percent = status.subtask_percent().unwrap_or(0);
    if let Some(failure) = status.first_failure().map(str::to_owned) {
        status.progress.report(percent);
        status.progress.fail(failure, now);
    } else if status.all_subtasks_succeeded() {
        status.progress.succeed(now);
    } else {
        status.progress.report(percent);
    }
}

/// Completion of `done` out of `total`, rounded down.
fn percent_of(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = u64::from(done.min(total)) * 100 / u64::from(total);
    u8::try_from(percent).unwrap_or(100)
}

/// Strictly more than `budget` has passed since `since`.
fn exceeded(since: DateTime<Utc>, now: DateTime<Utc>, budget: Duration) -> bool {
    TimeDelta::from_std(budget).is_ok_and(|budget| now - since > budget)
}

// ── App start ─────────────────────────────────────────────────────────────────

impl<G: AppInspector> Probe<G> for AppStartTask {
    async fn probe(&self, gateway: &G, ctx: &PollContext) -> Self {
        let mut next = self.clone();
        next.polls += 1;
        let first_poll = *next.first_poll_at.get_or_insert(ctx.now);

        match gateway
            .count_running_instances(&self.space, &self.app_name, self.instance_count)
            .await
        {
            Err(err) => {
                warn!(app = %self.app_name, error = %err, "app cannot start");
                next.progress.fail(failure_chain(&err), ctx.now);
                return next;
            }
            Ok(running) if running >= self.instance_count => {
                info!(app = %self.app_name, running, polls = next.polls, "all app instances running");
                next.progress.succeed(ctx.now);
                return next;
            }
            Ok(running) => {
                debug!(app = %self.app_name, running, expected = self.instance_count, "app instances not all running yet");
                let percent = percent_of(running, self.instance_count);
                next.progress.report(percent.max(self.progress.percent));
            }
        }

        if exceeded(first_poll, ctx.now, ctx.timeouts.app_start) {
            gateway.log_app_diagnostics(&self.space, &self.app_name).await;
            let message = format!(
                "timeout waiting for app {} to start: polled {} times and waited {} s (max is:{} s)",
                self.app_name,
                next.polls,
                (ctx.now - first_poll).num_seconds(),
                ctx.timeouts.app_start.as_secs()
            );
            warn!(app = %self.app_name, "{message}");
            next.progress.fail(message, ctx.now);
        }
        next
    }
}

// ── Managed service provisioning ──────────────────────────────────────────────

impl<G: ServiceGateway> Probe<G> for ServiceProvisionTask {
    async fn probe(&self, gateway: &G, ctx: &PollContext) -> Self {
        let mut next = self.clone();
        next.polls += 1;
        let first_poll = *next.first_poll_at.get_or_insert(ctx.now);

        match gateway.last_operation(&self.space, &self.service_name).await {
            Ok(None) => {
                // gone or silent: nothing left to wait for
                info!(service = %self.service_name, "no pending operation on service");
                next.progress.succeed(ctx.now);
                return next;
            }
            Ok(Some(op)) => match op.state {
                OperationState::Succeeded => {
                    info!(service = %self.service_name, operation = %op.op_type, "service operation succeeded");
                    next.progress.succeed(ctx.now);
                    return next;
                }
                OperationState::Failed => {
                    warn!(service = %self.service_name, operation = %op.op_type, "service operation failed");
                    next.progress.fail(op.to_string(), ctx.now);
                    return next;
                }
                OperationState::InProgress => {
                    debug!(service = %self.service_name, "{op}");
                    next.progress.report(next.progress.percent);
                }
            },
            Err(err) => {
                warn!(service = %self.service_name, error = %err, "cannot read service state, retrying on next poll");
                next.progress.report(next.progress.percent);
            }
        }

        if exceeded(first_poll, ctx.now, ctx.timeouts.service) {
            let message = format!(
                "timeout waiting for service {}: polled {} times and waited {} s (max is:{} s)",
                self.service_name,
                next.polls,
                (ctx.now - first_poll).num_seconds(),
                ctx.timeouts.service.as_secs()
            );
            warn!(service = %self.service_name, "{message}");
            next.progress.fail(message, ctx.now);
        }
        next
    }
}

/// `error: cause: cause` in one line, for failure messages.
fn failure_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
