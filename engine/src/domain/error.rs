//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra` or `crate::application`.
//! `PlatformError` is what the control-plane SDK reports; `ActivationError`
//! is what the engine surfaces to its callers, always with resource context.

use std::fmt;

use thiserror::Error;

// ── Resource kinds ────────────────────────────────────────────────────────────

/// The fixed set of resource kinds this engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    App,
    Service,
    Route,
    Domain,
    Space,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::App => "app",
            Self::Service => "service",
            Self::Route => "route",
            Self::Domain => "domain",
            Self::Space => "space",
        })
    }
}

// ── Platform errors ───────────────────────────────────────────────────────────

/// Faults reported by the control-plane SDK.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("staging failed: {0}")]
    StagingFailed(String),

    #[error("staging not finished yet")]
    StagingInProgress,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl PlatformError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP 5xx answers, worth another read.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { status, .. } if *status >= 500)
    }

    /// The platform refused the requested name; another candidate may pass.
    #[must_use]
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

// ── Activation errors ─────────────────────────────────────────────────────────

/// Faults surfaced by gateway and activation services.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("{kind} '{name}' already exists in '{scope}'")]
    AlreadyExists {
        kind: ResourceKind,
        name: String,
        scope: String,
    },

    #[error("unable to {action} {kind} '{name}'")]
    Platform {
        kind: ResourceKind,
        name: String,
        action: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error("unable to {action} {kind} '{requested}' after {attempts} attempts")]
    RetriesExhausted {
        kind: ResourceKind,
        requested: String,
        action: &'static str,
        attempts: u32,
        #[source]
        last: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{kind} '{name}' is {actual} after {action}")]
    UnexpectedState {
        kind: ResourceKind,
        name: String,
        action: &'static str,
        actual: String,
    },

    #[error("artifact unavailable for app '{app}'")]
    ArtifactUnavailable {
        app: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: ResourceKind, reason: String },
}

impl ActivationError {
    /// Closure for `map_err` wrapping an SDK fault with resource context.
    pub fn platform(
        kind: ResourceKind,
        name: impl Into<String>,
        action: &'static str,
    ) -> impl FnOnce(PlatformError) -> Self {
        let name = name.into();
        move |source| Self::Platform {
            kind,
            name,
            action,
            source,
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// The underlying SDK fault, when there is one.
    #[must_use]
    pub fn platform_cause(&self) -> Option<&PlatformError> {
        match self {
            Self::Platform { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Result of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}
