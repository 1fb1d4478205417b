//! Semantic version policy.

use super::types::PolicyError;
use crate::version::{is_upgrade, parse_version, Granularity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemverPolicy {
    granularity: Granularity,
}

impl SemverPolicy {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn name(&self) -> &'static str {
        self.granularity.as_str()
    }

    /// Both tags must be valid versions; downgrades are never recommended.
    pub fn should_update(&self, current: &str, new: &str) -> Result<bool, PolicyError> {
        let current = parse_version(current)?;
        let new = parse_version(new)?;
        Ok(is_upgrade(&current, &new, self.granularity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_policy_boundaries() {
        let p = SemverPolicy::new(Granularity::Minor);
        assert!(p.should_update("1.2.3", "1.3.0").unwrap());
        assert!(!p.should_update("1.2.3", "1.2.4").unwrap());
        assert!(!p.should_update("1.2.3", "2.0.0").unwrap());
    }

    #[test]
    fn all_policy_equal_versions() {
        let p = SemverPolicy::new(Granularity::All);
        assert!(p.should_update("1.2.3", "1.2.4").unwrap());
        assert!(!p.should_update("1.2.3", "1.2.3").unwrap());
    }

    #[test]
    fn rejects_non_semver_tags() {
        let p = SemverPolicy::new(Granularity::Patch);
        assert!(matches!(
            p.should_update("latest", "1.0.1"),
            Err(PolicyError::Parse(_))
        ));
        assert!(p.should_update("1.0.0", "nightly").is_err());
    }
}
