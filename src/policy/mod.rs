//! Update policies.
//!
//! A policy is resolved from deployment labels for every event and decides
//! whether a newly pushed tag should replace the running one.

pub mod force;
pub mod pattern;
pub mod resolver;
pub mod semver;
pub mod types;

pub use force::ForcePolicy;
pub use pattern::{GlobPolicy, RegexpPolicy};
pub use resolver::{
    get_policy, get_policy_from_labels, PolicyOptions, LEGACY_MATCH_TAG_LABEL,
    LEGACY_POLICY_LABEL, MATCH_TAG_LABEL, POLICY_LABEL,
};
pub use semver::SemverPolicy;
pub use types::{Policy, PolicyError, PolicyType};
