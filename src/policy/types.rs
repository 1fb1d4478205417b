//! The closed set of update policies and their shared contract.

use thiserror::Error;

use super::force::ForcePolicy;
use super::pattern::{GlobPolicy, RegexpPolicy};
use super::semver::SemverPolicy;
use crate::version::VersionError;

/// Discriminant reported by [`Policy::policy_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    None,
    Semver,
    Force,
    Glob,
    Regexp,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::None => "none",
            PolicyType::Semver => "semver",
            PolicyType::Force => "force",
            PolicyType::Glob => "glob",
            PolicyType::Regexp => "regexp",
        }
    }
}

/// Policy construction and evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("invalid {kind} pattern '{policy}': {reason}")]
    Pattern {
        kind: &'static str,
        policy: String,
        reason: String,
    },

    #[error("version parse error: {0}")]
    Parse(#[from] VersionError),
}

/// A configured rule deciding whether a new tag warrants an update.
///
/// Built fresh for every resolution, so label edits apply on the next event.
#[derive(Debug, Clone)]
pub enum Policy {
    None,
    Semver(SemverPolicy),
    Force(ForcePolicy),
    Glob(GlobPolicy),
    Regexp(RegexpPolicy),
}

impl Policy {
    /// Decide whether a container running `current` should move to `new`.
    ///
    /// # Errors
    /// Returns `PolicyError::Parse` when a semver policy sees a non-semver tag.
    pub fn should_update(&self, current: &str, new: &str) -> Result<bool, PolicyError> {
        match self {
            Policy::None => Ok(false),
            Policy::Semver(p) => p.should_update(current, new),
            Policy::Force(p) => Ok(p.should_update(current, new)),
            Policy::Glob(p) => Ok(p.should_update(current, new)),
            Policy::Regexp(p) => Ok(p.should_update(current, new)),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Policy::None => "nil policy".to_string(),
            Policy::Semver(p) => p.name().to_string(),
            Policy::Force(p) => p.name().to_string(),
            Policy::Glob(p) => p.name().to_string(),
            Policy::Regexp(p) => p.name().to_string(),
        }
    }

    pub fn policy_type(&self) -> PolicyType {
        match self {
            Policy::None => PolicyType::None,
            Policy::Semver(_) => PolicyType::Semver,
            Policy::Force(_) => PolicyType::Force,
            Policy::Glob(_) => PolicyType::Glob,
            Policy::Regexp(_) => PolicyType::Regexp,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Policy::None)
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.policy_type().as_str())
    }
}
