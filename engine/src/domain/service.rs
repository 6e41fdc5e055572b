//! Bindable services: user-provided and managed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ActivationError, ResourceKind};

/// Externally operated service registered for binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProvidedService {
    pub name: String,
    pub space: String,
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
}

/// Service instance provisioned by a broker from the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedService {
    pub name: String,
    pub space: String,
    /// Marketplace offering, e.g. `p-rabbitmq`.
    pub label: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Service {
    UserProvided(UserProvidedService),
    Managed(ManagedService),
}

impl Service {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::UserProvided(s) => &s.name,
            Self::Managed(s) => &s.name,
        }
    }

    #[must_use]
    pub fn space(&self) -> &str {
        match self {
            Self::UserProvided(s) => &s.space,
            Self::Managed(s) => &s.space,
        }
    }

    pub fn validate(&self) -> Result<(), ActivationError> {
        let invalid = |reason: String| ActivationError::Invalid {
            kind: ResourceKind::Service,
            reason,
        };
        if self.name().trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if self.space().trim().is_empty() {
            return Err(invalid(format!("'{}' has no space", self.name())));
        }
        if let Self::Managed(m) = self {
            if m.label.trim().is_empty() || m.plan.trim().is_empty() {
                return Err(invalid(format!("'{}' needs a label and a plan", m.name)));
            }
        }
        Ok(())
    }
}

/// State of the broker's last operation on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

/// Last operation reported for a managed service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    /// `create`, `update` or `delete`.
    pub op_type: String,
    pub state: OperationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LastOperation {
    pub fn new(op_type: impl Into<String>, state: OperationState) -> Self {
        Self {
            op_type: op_type.into(),
            state,
            description: None,
        }
    }
}

impl fmt::Display for LastOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, &self.description) {
            (OperationState::InProgress, _) => write!(f, "{} is still in progress", self.op_type),
            (OperationState::Succeeded, _) => write!(f, "{} succeeded", self.op_type),
            (OperationState::Failed, None) => write!(f, "{} has failed", self.op_type),
            (OperationState::Failed, Some(description)) => {
                write!(f, "{} has failed: {description}", self.op_type)
            }
        }
    }
}
