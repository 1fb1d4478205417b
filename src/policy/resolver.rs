//! Policy resolution from policy names and deployment labels.

use std::collections::BTreeMap;

use super::force::ForcePolicy;
use super::pattern::{GlobPolicy, RegexpPolicy, GLOB_PREFIX, REGEXP_PREFIX};
use super::semver::SemverPolicy;
use super::types::Policy;
use crate::version::Granularity;

/// Canonical policy label.
pub const POLICY_LABEL: &str = "imagepilot.sh/policy";
/// Legacy policy label, read only when the canonical one is absent.
pub const LEGACY_POLICY_LABEL: &str = "imagepilot.observer/policy";
/// Canonical force tag-match label.
pub const MATCH_TAG_LABEL: &str = "imagepilot.sh/match-tag";
/// Legacy force tag-match label.
pub const LEGACY_MATCH_TAG_LABEL: &str = "imagepilot.sh/force-match";

/// Additional options read alongside the policy name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyOptions {
    pub match_tag: bool,
}

/// Build a policy from its configured name.
///
/// Malformed patterns and unknown names resolve to [`Policy::None`] so a bad
/// label never stops event processing.
pub fn get_policy(policy_name: &str, options: PolicyOptions) -> Policy {
    if policy_name.starts_with(GLOB_PREFIX) {
        return match GlobPolicy::new(policy_name) {
            Ok(p) => Policy::Glob(p),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    policy = policy_name,
                    "failed to parse glob policy, check your deployment configuration"
                );
                Policy::None
            }
        };
    }

    if policy_name.starts_with(REGEXP_PREFIX) {
        return match RegexpPolicy::new(policy_name) {
            Ok(p) => Policy::Regexp(p),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    policy = policy_name,
                    "failed to parse regexp policy, check your deployment configuration"
                );
                Policy::None
            }
        };
    }

    if let Some(granularity) = Granularity::from_name(policy_name) {
        return Policy::Semver(SemverPolicy::new(granularity));
    }

    if policy_name == "force" {
        return Policy::Force(ForcePolicy::new(options.match_tag));
    }

    tracing::info!(policy = policy_name, "unknown policy, ignoring");
    Policy::None
}

/// Resolve the policy configured on a deployment's labels.
pub fn get_policy_from_labels(labels: &BTreeMap<String, String>) -> Policy {
    match policy_name_from_labels(labels) {
        Some(name) => get_policy(
            name,
            PolicyOptions {
                match_tag: match_tag_from_labels(labels),
            },
        ),
        None => Policy::None,
    }
}

fn policy_name_from_labels(labels: &BTreeMap<String, String>) -> Option<&str> {
    labels
        .get(POLICY_LABEL)
        .or_else(|| labels.get(LEGACY_POLICY_LABEL))
        .map(String::as_str)
}

fn match_tag_from_labels(labels: &BTreeMap<String, String>) -> bool {
    labels
        .get(MATCH_TAG_LABEL)
        .or_else(|| labels.get(LEGACY_MATCH_TAG_LABEL))
        .is_some_and(|v| v == "true")
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
