// Copyright 2024-2026 ImagePilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cluster read/write capabilities and an in-memory implementation.
//!
//! The controller only depends on [`ClusterReader`] and [`ClusterWriter`];
//! a concrete API client lives outside this crate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use super::types::{ClusterManifest, Deployment};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("failed to list {scope}: {reason}")]
    List { scope: String, reason: String },

    #[error("failed to update deployment {namespace}/{name}: {reason}")]
    Write {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("deployment {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("invalid cluster manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to namespaces and deployments.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn namespaces(&self) -> Result<Vec<String>, ClusterError>;

    async fn deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError>;
}

/// Write access for applying rewritten deployments.
#[async_trait]
pub trait ClusterWriter: Send + Sync {
    async fn update(&self, deployment: &Deployment) -> Result<(), ClusterError>;
}

type DeploymentKey = (String, String);

/// Thread-safe in-memory cluster, seeded from a manifest.
#[derive(Default)]
pub struct MemoryCluster {
    namespaces: RwLock<BTreeSet<String>>,
    deployments: RwLock<BTreeMap<DeploymentKey, Deployment>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: ClusterManifest) -> Self {
        let cluster = Self::new();
        cluster.namespaces.write().extend(manifest.namespaces);
        for deployment in manifest.deployments {
            cluster.insert(deployment);
        }
        cluster
    }

    /// Load a JSON manifest file.
    ///
    /// # Errors
    /// Returns `ClusterError::Io` or `ClusterError::Manifest`.
    pub fn load(path: &Path) -> Result<Self, ClusterError> {
        let raw = std::fs::read_to_string(path)?;
        let manifest: ClusterManifest = serde_json::from_str(&raw)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Insert or replace a deployment; its namespace is registered implicitly.
    pub fn insert(&self, deployment: Deployment) {
        self.namespaces.write().insert(deployment.namespace.clone());
        let key = (deployment.namespace.clone(), deployment.name.clone());
        self.deployments.write().insert(key, deployment);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.deployments
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn manifest(&self) -> ClusterManifest {
        ClusterManifest {
            namespaces: self.namespaces.read().iter().cloned().collect(),
            deployments: self.deployments.read().values().cloned().collect(),
        }
    }
}

#[async_trait]
impl ClusterReader for MemoryCluster {
    async fn namespaces(&self) -> Result<Vec<String>, ClusterError> {
        Ok(self.namespaces.read().iter().cloned().collect())
    }

    async fn deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError> {
        if !self.namespaces.read().contains(namespace) {
            return Err(ClusterError::List {
                scope: format!("deployments in namespace {}", namespace),
                reason: "namespace does not exist".to_string(),
            });
        }
        Ok(self
            .deployments
            .read()
            .values()
            .filter(|d| d.namespace == namespace)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClusterWriter for MemoryCluster {
    async fn update(&self, deployment: &Deployment) -> Result<(), ClusterError> {
        let key = (deployment.namespace.clone(), deployment.name.clone());
        let mut deployments = self.deployments.write();
        match deployments.get_mut(&key) {
            Some(existing) => {
                *existing = deployment.clone();
                Ok(())
            }
            None => Err(ClusterError::NotFound {
                namespace: deployment.namespace.clone(),
                name: deployment.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryCluster {
        MemoryCluster::from_manifest(ClusterManifest {
            namespaces: vec!["empty".to_string()],
            deployments: vec![
                Deployment::new("prod", "web").with_container("web", "nginx:1.0.0"),
                Deployment::new("dev", "api").with_container("api", "api:0.1.0"),
            ],
        })
    }

    #[tokio::test]
    async fn lists_namespaces_and_deployments() {
        let cluster = seeded();
        let namespaces = cluster.namespaces().await.unwrap();
        assert_eq!(namespaces, vec!["dev", "empty", "prod"]);

        let prod = cluster.deployments("prod").await.unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].name, "web");
        assert!(cluster.deployments("empty").await.unwrap().is_empty());
        assert!(cluster.deployments("missing").await.is_err());
    }

    #[tokio::test]
    async fn update_replaces_existing_only() {
        let cluster = seeded();
        let mut web = cluster.get("prod", "web").unwrap();
        web.containers[0].image = "nginx:1.1.0".to_string();
        cluster.update(&web).await.unwrap();
        assert_eq!(cluster.get("prod", "web").unwrap().containers[0].image, "nginx:1.1.0");

        let ghost = Deployment::new("prod", "ghost");
        assert!(matches!(
            cluster.update(&ghost).await,
            Err(ClusterError::NotFound { .. })
        ));
    }

    #[test]
    fn load_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.json");
        std::fs::write(
            &path,
            r#"{"deployments":[{"namespace":"ns","name":"d","containers":[{"name":"c","image":"i:1"}]}]}"#,
        )
        .unwrap();
        let cluster = MemoryCluster::load(&path).unwrap();
        assert!(cluster.get("ns", "d").is_some());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(MemoryCluster::load(&path), Err(ClusterError::Manifest(_))));
    }
}
