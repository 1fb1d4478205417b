// Copyright 2024-2026 ImagePilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Policy regression suite.
//!
//! Pins the externally visible decisions of every policy variant and the
//! label contract, through the public API only.

use std::collections::BTreeMap;
use std::sync::Arc;

use imagepilot::k8s::{Deployment, Event, MemoryCluster};
use imagepilot::policy::{
    get_policy, get_policy_from_labels, PolicyOptions, PolicyType, LEGACY_MATCH_TAG_LABEL,
    LEGACY_POLICY_LABEL, MATCH_TAG_LABEL, POLICY_LABEL,
};
use imagepilot::ImpactResolver;

fn opts() -> PolicyOptions {
    PolicyOptions::default()
}

// ============================================================================
// Policy decisions
// ============================================================================

#[test]
fn unrecognized_names_never_update() {
    for name in ["", "auto", "MINOR", "glob", "regexp", "force:true", "semver:minor"] {
        let p = get_policy(name, opts());
        assert_eq!(p.policy_type(), PolicyType::None);
        assert_eq!(p.should_update("1.0.0", "9.9.9"), Ok(false));
        assert_eq!(p.should_update("latest", "latest"), Ok(false));
    }
}

#[test]
fn semver_granularity_table() {
    let cases = [
        ("minor", "1.2.3", "1.3.0", true),
        ("minor", "1.2.3", "1.2.4", false),
        ("minor", "1.2.3", "2.0.0", false),
        ("all", "1.2.3", "1.2.4", true),
        ("all", "1.2.3", "1.2.3", false),
        ("all", "1.9.0", "1.10.0", true),
        ("patch", "1.2.9", "1.2.10", true),
        ("major", "9.0.0", "10.0.0", true),
        ("major", "1.2.3", "1.3.0", false),
    ];
    for (policy, current, new, expected) in cases {
        let p = get_policy(policy, opts());
        assert_eq!(
            p.should_update(current, new),
            Ok(expected),
            "{} {} -> {}",
            policy,
            current,
            new
        );
    }
}

#[test]
fn semver_never_downgrades() {
    for policy in ["all", "major", "minor", "patch"] {
        let p = get_policy(policy, opts());
        assert_eq!(p.should_update("3.4.5", "2.9.9"), Ok(false), "{}", policy);
        assert_eq!(p.should_update("3.4.5", "3.4.4"), Ok(false), "{}", policy);
        assert_eq!(p.should_update("3.4.5", "3.3.9"), Ok(false), "{}", policy);
    }
}

#[test]
fn force_tag_match() {
    let p = get_policy("force", PolicyOptions { match_tag: true });
    assert_eq!(p.should_update("latest", "latest"), Ok(true));
    assert_eq!(p.should_update("stable", "latest"), Ok(false));

    let p = get_policy("force", opts());
    assert_eq!(p.should_update("stable", "latest"), Ok(true));
}

#[test]
fn glob_policy_and_malformed_fallback() {
    let p = get_policy("glob:1.2.*", opts());
    assert_eq!(p.should_update("whatever", "1.2.5"), Ok(true));
    assert_eq!(p.should_update("whatever", "1.3.0"), Ok(false));
    assert_eq!(get_policy("glob:1.2.[", opts()).policy_type(), PolicyType::None);
    assert_eq!(get_policy("regexp:[", opts()).policy_type(), PolicyType::None);
}

// ============================================================================
// Label contract
// ============================================================================

#[test]
fn canonical_labels_win() {
    let labels: BTreeMap<String, String> = [
        (POLICY_LABEL, "force"),
        (LEGACY_POLICY_LABEL, "major"),
        (MATCH_TAG_LABEL, "true"),
        (LEGACY_MATCH_TAG_LABEL, "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let p = get_policy_from_labels(&labels);
    assert_eq!(p.policy_type(), PolicyType::Force);
    assert_eq!(p.should_update("stable", "latest"), Ok(false));
}

// ============================================================================
// Impacted set
// ============================================================================

#[tokio::test]
async fn impacted_set_matches_policy_decisions() {
    let cluster = MemoryCluster::new();
    let fixtures = [
        ("a", Some("all"), "repo/r:1.0.0"),
        ("b", Some("major"), "repo/r:1.0.0"),
        ("c", Some("patch"), "repo/r:1.0.0"),
        ("d", Some("glob:1.*"), "repo/r:0.1.0"),
        ("e", None, "repo/r:1.0.0"),
        ("f", Some("gibberish"), "repo/r:1.0.0"),
        ("g", Some("all"), "repo/other:1.0.0"),
    ];
    for (name, policy, image) in fixtures {
        let mut d = Deployment::new("ns", name).with_container("main", image);
        if let Some(policy) = policy {
            d = d.with_label(POLICY_LABEL, policy);
        }
        cluster.insert(d);
    }

    let resolver = ImpactResolver::new(Arc::new(cluster));
    let impacted = resolver
        .impacted_deployments(&Event::new("repo/r", "1.1.0"))
        .await
        .unwrap();

    let names: Vec<&str> = impacted.iter().map(|i| i.deployment.name.as_str()).collect();
    assert_eq!(names, vec!["a", "d"]);
    for item in &impacted {
        assert_eq!(item.deployment.containers[0].image, "repo/r:1.1.0");
    }
}
