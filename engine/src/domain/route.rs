//! Route URIs and the alternate-candidate rule used on name conflicts.

use std::fmt;
use std::sync::LazyLock;

use cfa_common::normalize_domain;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{ActivationError, ResourceKind};

/// Longest host a DNS label allows.
pub const MAX_HOST_LEN: usize = 63;

/// DNS label accepted as a route host.
pub static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

/// `host.domain`, the externally reachable address of an app.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteUri {
    pub host: String,
    pub domain: String,
}

impl RouteUri {
    pub fn new(host: impl Into<String>, domain: &str) -> Self {
        Self {
            host: host.into(),
            domain: normalize_domain(domain),
        }
    }

    /// Split `host.domain` at the first dot.
    pub fn parse(uri: &str) -> Result<Self, ActivationError> {
        let invalid = |reason: &str| ActivationError::Invalid {
            kind: ResourceKind::Route,
            reason: format!("'{uri}': {reason}"),
        };
        let (host, domain) = uri
            .trim()
            .split_once('.')
            .ok_or_else(|| invalid("expected host.domain"))?;
        let route = Self::new(host, domain);
        if route.domain.is_empty() {
            return Err(invalid("empty domain"));
        }
        route.validate()?;
        Ok(route)
    }

    pub fn validate(&self) -> Result<(), ActivationError> {
        if HOST_RE.is_match(&self.host) {
            Ok(())
        } else {
            Err(ActivationError::Invalid {
                kind: ResourceKind::Route,
                reason: format!(
                    "host '{}' must match ^[a-z0-9]([a-z0-9-]{{0,61}}[a-z0-9])?$",
                    self.host
                ),
            })
        }
    }

    /// Candidate for the given attempt. Attempt 0 is the route itself; later
    /// attempts prefix the original host, so prefixes never stack. The host
    /// is shortened so the candidate stays a valid DNS label.
    #[must_use]
    pub fn candidate(&self, attempt: u32) -> Self {
        if attempt == 0 {
            return self.clone();
        }
        let prefix = format!("alt{attempt}-");
        let keep = MAX_HOST_LEN.saturating_sub(prefix.len());
        let host: String = self.host.chars().take(keep).collect();
        Self {
            host: format!("{prefix}{}", host.trim_end_matches('-')),
            domain: self.domain.clone(),
        }
    }

    /// Same route once both sides are normalized.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
            && normalize_domain(&self.domain) == normalize_domain(&other.domain)
    }
}

impl fmt::Display for RouteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.host, self.domain)
    }
}
