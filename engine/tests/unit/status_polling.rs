//! Status polling of app starts and managed service provisioning.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use cfa_common::{AppStartTask, ServiceProvisionTask, TaskState, TaskStatus};
use cfa_engine::application::services::polling::{PollTimeouts, StatusPoller};
use cfa_engine::domain::{AppState, LastOperation, OperationState, PlatformError};
use cfa_engine::infra::simulated::SimulatedPlatform;

use crate::helpers::{ManualClock, SPACE, gateway, t0};

fn starting(app: &str, instances: u32) -> TaskStatus<AppStartTask> {
    TaskStatus::new(format!("starting app <{app}>"), t0())
        .with_subtask(AppStartTask::new(app, SPACE, instances, t0()))
}

fn provisioning(service: &str) -> TaskStatus<ServiceProvisionTask> {
    TaskStatus::new(format!("creating service <{service}>"), t0())
        .with_subtask(ServiceProvisionTask::new(service, SPACE, t0()))
}

fn short_timeouts() -> PollTimeouts {
    PollTimeouts {
        app_start: Duration::from_secs(60),
        service: Duration::from_secs(60),
    }
}

// ── App start ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn partial_instances_report_a_percentage() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 4)
        .script_running_instances("joyn", &[1, 2]);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let first = poller.advance(&starting("joyn", 4)).await;
    let second = poller.advance(&first).await;

    assert_eq!(first.progress.percent, 25);
    assert_eq!(first.progress.state, TaskState::Running);
    assert_eq!(second.progress.percent, 50);
    assert_eq!(second.subtasks[0].polls, 2);
}

#[tokio::test]
async fn start_times_out_strictly_after_the_budget() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 1)
        .script_running_instances("joyn", &[0]);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, short_timeouts());

    let status = poller.advance(&starting("joyn", 1)).await;
    clock.advance(60);
    let status = poller.advance(&status).await;
    assert!(!status.is_complete());

    clock.advance(1);
    let status = poller.advance(&status).await;

    assert!(status.progress.has_failed());
    let failure = status.progress.failure.as_deref().unwrap();
    assert_eq!(
        failure,
        "timeout waiting for app joyn to start: polled 3 times and waited 61 s (max is:60 s)"
    );
    assert_eq!(platform.count_calls("recent_logs"), 1);
}

#[tokio::test]
async fn start_timeout_fails_even_when_diagnostics_cannot_be_read() {
    let unreachable = PlatformError::Transport("connection reset".to_string());
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 1)
        .script_running_instances("joyn", &[0])
        .fail("recent_logs", unreachable.clone())
        .fail("staging_logs", unreachable.clone())
        .fail("app_stats", unreachable);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, short_timeouts());

    let status = poller.advance(&starting("joyn", 1)).await;
    clock.advance(61);
    let status = poller.advance(&status).await;

    assert!(status.progress.has_failed());
    assert_eq!(
        status.progress.failure.as_deref(),
        Some("timeout waiting for app joyn to start: polled 2 times and waited 61 s (max is:60 s)")
    );
    assert_eq!(platform.count_calls("recent_logs"), 1);
    assert_eq!(platform.count_calls("app_stats"), 1);
}

#[tokio::test]
async fn failed_instance_read_does_not_lower_the_percent() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 4)
        .script_running_instances("joyn", &[2]);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let first = poller.advance(&starting("joyn", 4)).await;
    let _ = platform.clone().fail(
        "app_instances",
        PlatformError::Transport("connection reset".to_string()),
    );
    let second = poller.advance(&first).await;

    assert_eq!(first.progress.percent, 50);
    assert_eq!(second.subtasks[0].progress.percent, 50);
    assert_eq!(second.subtasks[0].progress.state, TaskState::Running);
    assert_eq!(second.progress.percent, 50);
    assert_eq!(platform.count_calls("app_instances"), 2);
}

#[tokio::test]
async fn staging_failure_fails_the_task_at_once() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 1)
        .fail_staging("joyn", "no buildpack detected");
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let status = poller.advance(&starting("joyn", 1)).await;

    assert!(status.progress.has_failed());
    assert_eq!(
        status.progress.failure.as_deref(),
        Some("unable to stage app 'joyn': staging failed: no buildpack detected")
    );
}

#[tokio::test]
async fn terminal_snapshot_is_returned_without_gateway_calls() {
    let platform = SimulatedPlatform::new().with_app(SPACE, "joyn", AppState::Started, 1);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let done = poller.advance(&starting("joyn", 1)).await;
    assert!(done.progress.has_succeeded());
    let calls = platform.calls().len();

    let again = poller.advance(&done).await;

    assert_eq!(again, done);
    assert_eq!(platform.calls().len(), calls);
}

#[tokio::test]
async fn terminal_subtasks_are_not_polled_again() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "fast", AppState::Started, 1)
        .with_app(SPACE, "slow", AppState::Started, 1)
        .script_running_instances("slow", &[0, 0, 1]);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());
    let mut status = TaskStatus::new("starting apps", t0())
        .with_subtask(AppStartTask::new("fast", SPACE, 1, t0()))
        .with_subtask(AppStartTask::new("slow", SPACE, 1, t0()));

    for _ in 0..3 {
        status = poller.advance(&status).await;
    }

    assert!(status.progress.has_succeeded());
    assert_eq!(status.subtasks[0].polls, 1);
    assert_eq!(status.subtasks[1].polls, 3);
    assert_eq!(
        platform
            .calls()
            .iter()
            .filter(|c| *c == "app_instances fast")
            .count(),
        1
    );
}

#[tokio::test]
async fn one_failed_subtask_fails_the_parent() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "good", AppState::Started, 1)
        .with_app(SPACE, "bad", AppState::Started, 1)
        .fail_staging("bad", "out of memory");
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());
    let status = TaskStatus::new("starting apps", t0())
        .with_subtask(AppStartTask::new("good", SPACE, 1, t0()))
        .with_subtask(AppStartTask::new("bad", SPACE, 1, t0()));

    let status = poller.advance(&status).await;

    assert!(status.progress.has_failed());
    assert!(status.subtasks[0].progress.has_succeeded());
    assert!(status.progress.failure.as_deref().unwrap().contains("out of memory"));
}

// ── Managed services ──────────────────────────────────────────────────────────

#[tokio::test]
async fn broker_in_progress_then_succeeded() {
    let in_progress = LastOperation::new("create", OperationState::InProgress);
    let succeeded = LastOperation::new("create", OperationState::Succeeded);
    let platform = SimulatedPlatform::new()
        .with_service(SPACE, "rabbit", Some(in_progress.clone()))
        .script_last_operations("rabbit", &[in_progress, succeeded]);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let first = poller.advance(&provisioning("rabbit")).await;
    let second = poller.advance(&first).await;

    assert_eq!(first.progress.state, TaskState::Running);
    assert!(second.progress.has_succeeded());
}

#[tokio::test]
async fn broker_failure_carries_its_description() {
    let mut failed = LastOperation::new("create", OperationState::Failed);
    failed.description = Some("quota exceeded".to_string());
    let platform = SimulatedPlatform::new().with_service(SPACE, "rabbit", Some(failed));
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let status = poller.advance(&provisioning("rabbit")).await;

    assert!(status.progress.has_failed());
    assert_eq!(
        status.progress.failure.as_deref(),
        Some("create has failed: quota exceeded")
    );
}

#[tokio::test]
async fn vanished_or_silent_service_counts_as_done() {
    let platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_service(SPACE, "silent", None);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, PollTimeouts::default());

    let gone = poller.advance(&provisioning("gone")).await;
    let silent = poller.advance(&provisioning("silent")).await;

    assert!(gone.progress.has_succeeded());
    assert!(silent.progress.has_succeeded());
}

#[tokio::test]
async fn service_times_out() {
    let platform = SimulatedPlatform::new().with_service(
        SPACE,
        "rabbit",
        Some(LastOperation::new("create", OperationState::InProgress)),
    );
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let poller = StatusPoller::new(&gw, &clock, short_timeouts());

    let status = poller.advance(&provisioning("rabbit")).await;
    clock.advance(61);
    let status = poller.advance(&status).await;

    assert!(status.progress.has_failed());
    assert!(
        status
            .progress
            .failure
            .as_deref()
            .unwrap()
            .starts_with("timeout waiting for service rabbit: polled 2 times")
    );
}
