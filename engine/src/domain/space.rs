//! Space names and the roles granted on a freshly created space.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{ActivationError, ResourceKind};

pub static SPACE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("valid regex")
});

/// Reject names the platform would refuse or that break log parsing.
pub fn validate_space_name(name: &str) -> Result<(), ActivationError> {
    if SPACE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ActivationError::Invalid {
            kind: ResourceKind::Space,
            reason: format!("'{name}' must match ^[A-Za-z0-9][A-Za-z0-9_.-]{{0,63}}$"),
        })
    }
}

/// Candidate for attempt `n` when reserving a free space name.
#[must_use]
pub fn candidate_name(label: &str, attempt: u32) -> String {
    if attempt == 0 {
        label.to_string()
    } else {
        format!("{label}-{attempt}")
    }
}

/// Roles granted to the engine's user on every space it creates, in grant
/// order.
pub const CREATOR_ROLES: [SpaceRole; 3] =
    [SpaceRole::Manager, SpaceRole::Auditor, SpaceRole::Developer];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceRole {
    Manager,
    Auditor,
    Developer,
}

impl fmt::Display for SpaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manager => "manager",
            Self::Auditor => "auditor",
            Self::Developer => "developer",
        })
    }
}
