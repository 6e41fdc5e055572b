//! Route and domain use-cases.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use cfa_engine::application::services::route;
use cfa_engine::domain::{ActivationError, DeleteOutcome, PlatformError, ResourceKind, RouteUri};
use cfa_engine::infra::simulated::SimulatedPlatform;

use crate::helpers::{SHARED_DOMAIN, SPACE, gateway};

fn joyn() -> RouteUri {
    RouteUri::new("joyn", SHARED_DOMAIN)
}

#[tokio::test]
async fn activate_creates_the_requested_route() {
    let platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_domain(SHARED_DOMAIN);
    let gw = gateway(&platform);

    let created = route::activate(&gw, SPACE, &joyn()).await.expect("activate");

    assert_eq!(created, joyn());
    assert!(platform.has_route(&joyn()));
    assert_eq!(platform.count_calls("add_domain"), 0);
}

#[tokio::test]
async fn activate_registers_an_unknown_domain_first() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);
    let wanted = RouteUri::new("joyn", "Apps.Acme.IO");

    route::activate(&gw, SPACE, &wanted).await.expect("activate");

    assert!(platform.has_domain("apps.acme.io"));
    let calls = platform.calls();
    let add = calls.iter().position(|c| c == "add_domain apps.acme.io").unwrap();
    let create = calls
        .iter()
        .position(|c| c == "create_route joyn.apps.acme.io")
        .unwrap();
    assert!(add < create);
}

#[tokio::test]
async fn activate_existing_route_is_refused() {
    let platform = SimulatedPlatform::new().with_route(SPACE, &joyn(), None);
    let gw = gateway(&platform);

    let err = route::activate(&gw, SPACE, &joyn()).await.expect_err("exists");

    assert!(matches!(
        err,
        ActivationError::AlreadyExists {
            kind: ResourceKind::Route,
            ..
        }
    ));
    assert_eq!(platform.count_calls("create_route"), 0);
}

#[tokio::test]
async fn taken_host_falls_back_to_an_alternate_name() {
    let platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_domain(SHARED_DOMAIN)
        .reject_route(&joyn())
        .reject_route(&joyn().candidate(1));
    let gw = gateway(&platform);

    let created = route::activate(&gw, SPACE, &joyn()).await.expect("activate");

    assert_eq!(created, RouteUri::new("alt2-joyn", SHARED_DOMAIN));
    assert!(platform.has_route(&created));
    assert_eq!(platform.count_calls("create_route"), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let mut platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_domain(SHARED_DOMAIN);
    for attempt in 0..5 {
        platform = platform.reject_route(&joyn().candidate(attempt));
    }
    let gw = gateway(&platform);

    let err = route::activate(&gw, SPACE, &joyn()).await.expect_err("exhausted");

    match err {
        ActivationError::RetriesExhausted {
            kind, attempts, ..
        } => {
            assert_eq!(kind, ResourceKind::Route);
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(platform.count_calls("create_route"), 5);
}

#[tokio::test]
async fn non_conflict_failure_is_not_retried() {
    let platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_domain(SHARED_DOMAIN)
        .fail("create_route", PlatformError::Unauthorized("no quota".to_string()));
    let gw = gateway(&platform);

    let err = route::activate(&gw, SPACE, &joyn()).await.expect_err("fatal");

    assert!(matches!(err, ActivationError::Platform { action: "create", .. }));
    assert_eq!(platform.count_calls("create_route"), 1);
}

#[tokio::test]
async fn invalid_host_is_refused_before_any_call() {
    let platform = SimulatedPlatform::new().with_space(SPACE);
    let gw = gateway(&platform);

    let err = route::activate(&gw, SPACE, &RouteUri::new("Bad_Host", SHARED_DOMAIN))
        .await
        .expect_err("invalid");

    assert!(matches!(err, ActivationError::Invalid { .. }));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn delete_keeps_the_domain_and_is_idempotent() {
    let platform = SimulatedPlatform::new().with_route(SPACE, &joyn(), None);
    let gw = gateway(&platform);

    assert_eq!(
        route::delete(&gw, SPACE, &joyn()).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        route::delete(&gw, SPACE, &joyn()).await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );
    assert!(platform.has_domain(SHARED_DOMAIN));
    assert_eq!(platform.count_calls("delete_route"), 1);
}

#[tokio::test]
async fn domain_lifecycle() {
    let platform = SimulatedPlatform::new();
    let gw = gateway(&platform);

    route::activate_domain(&gw, "Apps.Acme.IO.").await.expect("add");
    assert!(platform.has_domain("apps.acme.io"));

    let err = route::activate_domain(&gw, "apps.acme.io").await.expect_err("exists");
    assert!(err.is_already_exists());

    assert_eq!(
        route::delete_domain(&gw, "apps.acme.io").await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        route::delete_domain(&gw, "apps.acme.io").await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );
    assert_eq!(platform.count_calls("delete_domain"), 1);
}

#[tokio::test]
async fn alternate_name_of_a_maximal_host_is_a_valid_label() {
    let requested = RouteUri::new("a".repeat(63), SHARED_DOMAIN);
    let platform = SimulatedPlatform::new()
        .with_space(SPACE)
        .with_domain(SHARED_DOMAIN)
        .reject_route(&requested);
    let gw = gateway(&platform);

    let created = route::activate(&gw, SPACE, &requested).await.expect("activate");

    assert_eq!(created.host, format!("alt1-{}", "a".repeat(58)));
    assert!(created.validate().is_ok());
    assert!(platform.has_route(&created));
    assert_eq!(platform.count_calls("create_route"), 2);
}
