//! Semantic version parsing and segment-wise comparison.
//!
//! Tags are parsed leniently: a leading `v` is dropped and partial versions
//! (`1`, `1.2`) are padded with zeros. Ordering is delegated to `semver`,
//! which compares each segment numerically.

use std::cmp::Ordering;

use semver::Version;
use thiserror::Error;

/// Which version segment must increase for an update to be recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    All,
    Major,
    Minor,
    Patch,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::All => "all",
            Granularity::Major => "major",
            Granularity::Minor => "minor",
            Granularity::Patch => "patch",
        }
    }

    /// Parse a granularity from its policy name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VersionError {
    #[error("empty version tag")]
    Empty,

    #[error("tag '{tag}' is not a semantic version: {reason}")]
    Invalid { tag: String, reason: String },
}

/// Parse an image tag as a semantic version.
pub fn parse_version(tag: &str) -> Result<Version, VersionError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(VersionError::Empty);
    }

    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let normalized = pad_partial(stripped);
    Version::parse(&normalized).map_err(|e| VersionError::Invalid {
        tag: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Pad `1` and `1.2` (optionally followed by pre-release/build) to three segments.
fn pad_partial(raw: &str) -> String {
    let split_at = raw.find(|c: char| c == '-' || c == '+').unwrap_or(raw.len());
    let (core, rest) = raw.split_at(split_at);
    let segments = core.split('.').count();
    if core.is_empty() || segments >= 3 {
        return raw.to_string();
    }
    let padding = ".0".repeat(3 - segments);
    format!("{core}{padding}{rest}")
}

/// Returns true iff `candidate` is strictly newer than `current` at the given granularity.
///
/// A pre-release candidate is only accepted when `current` is itself a pre-release.
pub fn is_upgrade(current: &Version, candidate: &Version, granularity: Granularity) -> bool {
    if !candidate.pre.is_empty() && current.pre.is_empty() {
        return false;
    }

    match granularity {
        Granularity::All => candidate.cmp_precedence(current) == Ordering::Greater,
        Granularity::Major => candidate.major > current.major,
        Granularity::Minor => {
            candidate.major == current.major && candidate.minor > current.minor
        }
        Granularity::Patch => {
            candidate.major == current.major
                && candidate.minor == current.minor
                && candidate.patch > current.patch
        }
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
