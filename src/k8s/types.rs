// Copyright 2024-2026 ImagePilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deployment and event types exchanged with the cluster and upstream producers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A new tag observed for a repository.
///
/// Produced upstream (registry poller, webhook), consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Repository name, optionally including the registry host.
    pub repository_name: String,
    /// The newly available tag.
    pub tag: String,
    /// Registry host the tag was pushed to (may be empty).
    #[serde(default)]
    pub registry_host: String,
}

impl Event {
    pub fn new(repository_name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository_name: repository_name.into(),
            tag: tag.into(),
            registry_host: String::new(),
        }
    }

    pub fn with_registry_host(mut self, host: impl Into<String>) -> Self {
        self.registry_host = host.into();
        self
    }
}

/// Container entry of a deployment's pod template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

/// Workload deployment as read from the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Pod template annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<Container>,
}

impl Deployment {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            containers: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_container(mut self, name: impl Into<String>, image: impl Into<String>) -> Self {
        self.containers.push(Container::new(name, image));
        self
    }

    /// `namespace/name` identifier used in logs and outcomes.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// One container image rewrite proposed for an impacted deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRewrite {
    pub container: String,
    pub from: String,
    pub to: String,
}

/// Serialized form of a set of deployments (operator manifest file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterManifest {
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
