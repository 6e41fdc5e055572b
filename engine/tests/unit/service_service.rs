//! Service use-cases: provision, delete, bind, unbind.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;

use cfa_common::TaskState;
use cfa_engine::application::services::service::{self, BindOutcome, UnbindOutcome};
use cfa_engine::domain::{
    ActivationError, AppState, DeleteOutcome, ManagedService, PlatformError, Service,
    UserProvidedService,
};
use cfa_engine::infra::simulated::SimulatedPlatform;

use crate::helpers::{ManualClock, SPACE, gateway};

fn user_provided(name: &str) -> Service {
    Service::UserProvided(UserProvidedService {
        name: name.to_string(),
        space: SPACE.to_string(),
        credentials: BTreeMap::from([("uri".to_string(), "amqp://mq.acme".to_string())]),
        syslog_drain_url: None,
    })
}

fn managed(name: &str) -> Service {
    Service::Managed(ManagedService {
        name: name.to_string(),
        space: SPACE.to_string(),
        label: "p-rabbitmq".to_string(),
        plan: "standard".to_string(),
    })
}

// ── activate ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_provided_service_is_ready_at_once() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);
    let clock = ManualClock::new();

    let status = service::activate(&gw, &clock, &user_provided("mq"))
        .await
        .expect("activate");

    assert!(status.is_complete());
    assert!(status.progress.has_succeeded());
    assert!(platform.has_service(SPACE, "mq"));
}

#[tokio::test]
async fn managed_service_returns_a_pending_snapshot() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);
    let clock = ManualClock::new();

    let status = service::activate(&gw, &clock, &managed("rabbit"))
        .await
        .expect("activate");

    assert_eq!(status.progress.state, TaskState::Pending);
    assert_eq!(status.subtasks.len(), 1);
    assert_eq!(status.subtasks[0].service_name, "rabbit");
    assert_eq!(platform.count_calls("create_service"), 1);
}

#[tokio::test]
async fn activate_existing_service_is_refused() {
    let platform = SimulatedPlatform::new().with_service(SPACE, "rabbit", None);
    let gw = gateway(&platform);
    let clock = ManualClock::new();

    let err = service::activate(&gw, &clock, &managed("rabbit"))
        .await
        .expect_err("exists");

    assert!(err.is_already_exists());
    assert_eq!(platform.count_calls("create_service"), 0);
}

#[tokio::test]
async fn managed_service_without_plan_is_invalid() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);
    let clock = ManualClock::new();
    let Service::Managed(mut rabbit) = managed("rabbit") else {
        unreachable!()
    };
    rabbit.plan = String::new();

    let err = service::activate(&gw, &clock, &Service::Managed(rabbit))
        .await
        .expect_err("invalid");

    assert!(matches!(err, ActivationError::Invalid { .. }));
    assert!(platform.calls().is_empty());
}

// ── delete ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_existing_service() {
    let platform = SimulatedPlatform::new().with_service(SPACE, "rabbit", None);
    let gw = gateway(&platform);

    let outcome = service::delete(&gw, SPACE, "rabbit").await.expect("delete");

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!platform.has_service(SPACE, "rabbit"));
}

#[tokio::test]
async fn delete_absent_service_makes_no_delete_call() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);

    let outcome = service::delete(&gw, SPACE, "rabbit").await.expect("delete");

    assert_eq!(outcome, DeleteOutcome::AlreadyAbsent);
    assert_eq!(platform.count_calls("delete_service"), 0);
}

#[tokio::test]
async fn delete_all_empties_the_space() {
    let platform = SimulatedPlatform::new()
        .with_service(SPACE, "mq", None)
        .with_service(SPACE, "db", None)
        .with_service("other", "cache", None);
    let gw = gateway(&platform);

    let deleted = service::delete_all(&gw, SPACE).await.expect("delete all");

    assert_eq!(deleted, 2);
    assert!(!platform.has_service(SPACE, "mq"));
    assert!(!platform.has_service(SPACE, "db"));
    assert!(platform.has_service("other", "cache"));
}

#[tokio::test]
async fn delete_all_stops_at_first_failure() {
    let platform = SimulatedPlatform::new()
        .with_service(SPACE, "mq", None)
        .fail("delete_service", PlatformError::Unauthorized("read-only".to_string()));
    let gw = gateway(&platform);

    let err = service::delete_all(&gw, SPACE).await.expect_err("fails");

    assert!(matches!(err, ActivationError::Platform { action: "delete", .. }));
}

#[test]
fn deletion_status_is_pending() {
    let clock = ManualClock::new();
    let status = service::deletion_status(&clock, SPACE, "rabbit");
    assert_eq!(status.progress.state, TaskState::Pending);
    assert_eq!(status.subtasks[0].service_name, "rabbit");
}

// ── bind / unbind ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bind_is_idempotent() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 1)
        .with_service(SPACE, "mq", None);
    let gw = gateway(&platform);

    assert_eq!(
        service::bind(&gw, SPACE, "joyn", "mq").await.unwrap(),
        BindOutcome::Bound
    );
    assert_eq!(
        service::bind(&gw, SPACE, "joyn", "mq").await.unwrap(),
        BindOutcome::AlreadyBound
    );
    assert_eq!(platform.count_calls("bind_service"), 1);
    assert_eq!(platform.bound_apps(SPACE, "mq"), vec!["joyn".to_string()]);
}

#[tokio::test]
async fn unbind_is_idempotent() {
    let platform = SimulatedPlatform::new()
        .with_app(SPACE, "joyn", AppState::Started, 1)
        .with_service(SPACE, "mq", None);
    let gw = gateway(&platform);
    service::bind(&gw, SPACE, "joyn", "mq").await.unwrap();

    assert_eq!(
        service::unbind(&gw, SPACE, "joyn", "mq").await.unwrap(),
        UnbindOutcome::Unbound
    );
    assert_eq!(
        service::unbind(&gw, SPACE, "joyn", "mq").await.unwrap(),
        UnbindOutcome::NotBound
    );
    assert_eq!(platform.count_calls("unbind_service"), 1);
    assert!(platform.bound_apps(SPACE, "mq").is_empty());
}
