//! ImagePilot - policy-driven image updates for Kubernetes deployments.
//!
//! Upstream producers submit new-tag events; the controller resolves each
//! deployment's update policy from its labels, decides which containers
//! should move to the new tag, and writes the rewritten deployments back.

pub mod config;
pub mod controller;
pub mod k8s;
pub mod policy;
pub mod telemetry;
pub mod version;

pub use config::{ConfigError, ControllerConfig, LogFormat};
pub use controller::{
    Controller, ControllerError, ControllerHandle, ControllerState, EventOutcome,
    ImpactResolver, ImpactedDeployment,
};
pub use k8s::{ClusterReader, ClusterWriter, Deployment, Event, MemoryCluster};
pub use policy::{get_policy, get_policy_from_labels, Policy, PolicyOptions, PolicyType};
pub use version::Granularity;
