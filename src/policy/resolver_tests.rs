//! Tests for policy resolution from names and labels.

use super::*;
use crate::policy::PolicyType;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_semver_names() {
    for (name, granularity) in [
        ("all", Granularity::All),
        ("major", Granularity::Major),
        ("minor", Granularity::Minor),
        ("patch", Granularity::Patch),
    ] {
        match get_policy(name, PolicyOptions::default()) {
            Policy::Semver(p) => assert_eq!(p.granularity(), granularity),
            other => panic!("{} resolved to {}", name, other),
        }
    }
}

#[test]
fn test_force_carries_match_tag() {
    let p = get_policy("force", PolicyOptions { match_tag: true });
    match p {
        Policy::Force(f) => assert!(f.match_tag()),
        other => panic!("expected force, got {}", other),
    }
    assert_eq!(get_policy("force", PolicyOptions::default()).name(), "force");
}

#[test]
fn test_unknown_names_resolve_to_none() {
    for name in ["", "Major", "latest", "semver", "force ", "glob", "regexp"] {
        let p = get_policy(name, PolicyOptions::default());
        assert_eq!(p.policy_type(), PolicyType::None, "{:?}", name);
        assert!(!p.should_update("1.0.0", "2.0.0").unwrap());
        assert_eq!(p.name(), "nil policy");
    }
}

#[test]
fn test_pattern_policies() {
    let glob = get_policy("glob:1.2.*", PolicyOptions::default());
    assert_eq!(glob.policy_type(), PolicyType::Glob);
    assert!(glob.should_update("", "1.2.5").unwrap());
    assert!(!glob.should_update("", "1.3.0").unwrap());

    let re = get_policy("regexp:^rc-", PolicyOptions::default());
    assert_eq!(re.policy_type(), PolicyType::Regexp);
    assert!(re.should_update("", "rc-7").unwrap());
}

#[test]
fn test_malformed_patterns_degrade_to_none() {
    assert!(get_policy("glob:a:b", PolicyOptions::default()).is_none());
    assert!(get_policy("glob:[abc", PolicyOptions::default()).is_none());
    assert!(get_policy("regexp:(", PolicyOptions::default()).is_none());
}

#[test]
fn test_labels_absent_is_none() {
    let p = get_policy_from_labels(&labels(&[("app", "web")]));
    assert!(p.is_none());
}

#[test]
fn test_canonical_label_wins_over_legacy() {
    let p = get_policy_from_labels(&labels(&[
        (POLICY_LABEL, "patch"),
        (LEGACY_POLICY_LABEL, "force"),
    ]));
    assert_eq!(p.name(), "patch");

    let legacy_only = get_policy_from_labels(&labels(&[(LEGACY_POLICY_LABEL, "major")]));
    assert_eq!(legacy_only.name(), "major");
}

#[test]
fn test_match_tag_label_precedence() {
    let p = get_policy_from_labels(&labels(&[
        (POLICY_LABEL, "force"),
        (MATCH_TAG_LABEL, "false"),
        (LEGACY_MATCH_TAG_LABEL, "true"),
    ]));
    assert!(matches!(p, Policy::Force(f) if !f.match_tag()));

    let p = get_policy_from_labels(&labels(&[
        (POLICY_LABEL, "force"),
        (LEGACY_MATCH_TAG_LABEL, "true"),
    ]));
    assert!(matches!(p, Policy::Force(f) if f.match_tag()));

    let p = get_policy_from_labels(&labels(&[
        (POLICY_LABEL, "force"),
        (MATCH_TAG_LABEL, "yes"),
    ]));
    assert!(matches!(p, Policy::Force(f) if !f.match_tag()));
}

#[test]
fn test_empty_label_value_is_none() {
    let p = get_policy_from_labels(&labels(&[(POLICY_LABEL, "")]));
    assert!(p.is_none());
}
