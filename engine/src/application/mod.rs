//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and `cfa_common`, never on
//! `crate::infra`.

pub mod ports;
pub mod services;

pub use ports::{
    AppInspector, AppLifecycle, ArtifactSource, Clock, ControlPlane, Gateway, PlatformSession,
    RouteGateway, ServiceGateway, SpaceGateway,
};
