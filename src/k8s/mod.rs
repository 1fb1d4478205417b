// Copyright 2024-2026 ImagePilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes-facing types and capabilities.
//!
//! Defines the deployment/event model, image reference handling, and the
//! reader/writer traits the controller drives.

pub mod cluster;
pub mod image;
pub mod types;

pub use cluster::{ClusterError, ClusterReader, ClusterWriter, MemoryCluster};
pub use image::{validate_tag, ImageError, ImageRef};
pub use types::{ClusterManifest, Container, Deployment, Event, ImageRewrite};
