//! Domain layer: pure types, validation and error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod app;
pub mod error;
pub mod route;
pub mod service;
pub mod space;

pub use app::{App, AppState, ArtifactRef, InstanceState};
pub use error::{ActivationError, DeleteOutcome, PlatformError, ResourceKind};
pub use route::RouteUri;
pub use service::{LastOperation, ManagedService, OperationState, Service, UserProvidedService};
pub use space::{CREATOR_ROLES, SpaceRole, candidate_name, validate_space_name};
