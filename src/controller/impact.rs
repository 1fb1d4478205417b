//! Deployment impact resolution.
//!
//! For one event, walks every namespace, resolves each deployment's policy
//! from its labels, and proposes per-container image rewrites. Failures are
//! contained to the namespace or deployment they occur in.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::Instrument;

use crate::k8s::{
    validate_tag, ClusterError, ClusterReader, Deployment, Event, ImageRef, ImageRewrite,
};
use crate::policy::{get_policy_from_labels, ForcePolicy, Policy, PolicyError};
use crate::version::parse_version;

/// Pod template annotation stamped when a rewrite keeps the running tag.
pub const UPDATE_TIME_ANNOTATION: &str = "imagepilot.sh/update-time";

/// A deployment that needs at least one container image change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactedDeployment {
    /// Deployment with rewrites already applied.
    pub deployment: Deployment,
    /// Name of the policy that approved the change.
    pub policy: String,
    pub rewrites: Vec<ImageRewrite>,
}

/// How a deployment's containers are checked against the event tag.
enum Check<'a> {
    /// Event tag parsed as a version; the policy decides.
    Versioned(&'a Policy),
    /// Event tag is not a version; only the force tag-match condition applies.
    Unversioned(ForcePolicy),
}

impl Check<'_> {
    fn should_update(&self, current: &str, new: &str) -> Result<bool, PolicyError> {
        match self {
            Check::Versioned(policy) => policy.should_update(current, new),
            Check::Unversioned(force) => Ok(force.should_update(current, new)),
        }
    }
}

/// Resolves which deployments an event impacts.
pub struct ImpactResolver {
    reader: Arc<dyn ClusterReader>,
    annotate_forced: bool,
    span: tracing::Span,
}

impl ImpactResolver {
    pub fn new(reader: Arc<dyn ClusterReader>) -> Self {
        Self {
            reader,
            annotate_forced: true,
            span: tracing::info_span!("impact_resolver"),
        }
    }

    /// Run resolution inside `span` instead of the default `impact_resolver` span.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.set_span(span);
        self
    }

    pub(crate) fn set_span(&mut self, span: tracing::Span) {
        self.span = span;
    }

    /// Toggle the forced-rollout annotation on same-image rewrites.
    pub fn with_update_annotations(mut self, enabled: bool) -> Self {
        self.annotate_forced = enabled;
        self
    }

    /// Compute the impacted deployments for `event`.
    ///
    /// # Errors
    /// Returns `ClusterError` only when namespaces cannot be listed at all.
    /// Per-namespace listing failures are logged and skipped. An event whose
    /// tag cannot be written into an image reference impacts nothing.
    pub async fn impacted_deployments(
        &self,
        event: &Event,
    ) -> Result<Vec<ImpactedDeployment>, ClusterError> {
        async {
            if let Err(e) = validate_tag(&event.tag) {
                tracing::warn!(
                    error = %e,
                    repository = %event.repository_name,
                    "rejecting event with invalid tag"
                );
                return Ok(Vec::new());
            }

            let deployments = self.deployments().await?;
            let tag_is_version = match parse_version(&event.tag) {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(tag = %event.tag, error = %e, "event tag is not a semantic version");
                    false
                }
            };

            let mut seen = BTreeSet::new();
            let mut impacted = Vec::new();

            for deployment in deployments {
                if !seen.insert(deployment.key()) {
                    continue;
                }

                let policy = get_policy_from_labels(&deployment.labels);
                let check = match (&policy, tag_is_version) {
                    (Policy::None, _) => continue,
                    (_, true) | (Policy::Glob(_), false) | (Policy::Regexp(_), false) => {
                        Check::Versioned(&policy)
                    }
                    (Policy::Force(force), false) => Check::Unversioned(*force),
                    (Policy::Semver(_), false) => {
                        tracing::warn!(
                            repository_tag = %event.tag,
                            deployment = %deployment.name,
                            namespace = %deployment.namespace,
                            policy = %policy.name(),
                            "got error while parsing repository tag"
                        );
                        continue;
                    }
                };

                match self.check_deployment(deployment, &check, &policy, event) {
                    Ok(Some(update)) => impacted.push(update),
                    Ok(None) => {}
                    Err((deployment, e)) => {
                        tracing::error!(
                            error = %e,
                            deployment = %deployment.name,
                            namespace = %deployment.namespace,
                            "got error while checking deployment"
                        );
                    }
                }
            }

            Ok::<_, ClusterError>(impacted)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Rewrite every container of `deployment` that tracks the event's repository.
    fn check_deployment(
        &self,
        mut deployment: Deployment,
        check: &Check<'_>,
        policy: &Policy,
        event: &Event,
    ) -> Result<Option<ImpactedDeployment>, (Deployment, PolicyError)> {
        let mut rewrites = Vec::new();
        let mut same_tag = false;

        for idx in 0..deployment.containers.len() {
            let container = &deployment.containers[idx];
            let image = match ImageRef::parse(&container.image) {
                Ok(image) => image,
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        container = %container.name,
                        deployment = %deployment.name,
                        "skipping container with unparsable image"
                    );
                    continue;
                }
            };
            if !image.matches_repository(&event.repository_name, &event.registry_host) {
                continue;
            }
            if image.is_digest_pinned() {
                tracing::info!(
                    container = %container.name,
                    deployment = %deployment.name,
                    image = %container.image,
                    "skipping container pinned by digest"
                );
                continue;
            }

            let should_update = match check.should_update(image.tag(), &event.tag) {
                Ok(should_update) => should_update,
                Err(e) => return Err((deployment, e)),
            };
            if !should_update {
                continue;
            }

            let to = image.with_tag(&event.tag);
            if let Err(e) = ImageRef::parse(&to) {
                tracing::warn!(
                    error = %e,
                    container = %container.name,
                    deployment = %deployment.name,
                    image = %to,
                    "rewritten image is invalid, leaving container unchanged"
                );
                continue;
            }
            same_tag |= image.tag() == event.tag;
            rewrites.push(ImageRewrite {
                container: container.name.clone(),
                from: container.image.clone(),
                to: to.clone(),
            });
            deployment.containers[idx].image = to;
        }

        if rewrites.is_empty() {
            return Ok(None);
        }

        if self.annotate_forced && same_tag {
            deployment.annotations.insert(
                UPDATE_TIME_ANNOTATION.to_string(),
                chrono::Utc::now().to_rfc3339(),
            );
        }

        tracing::info!(
            deployment = %deployment.name,
            namespace = %deployment.namespace,
            policy = %policy.name(),
            containers = rewrites.len(),
            "impacted deployment found"
        );

        Ok(Some(ImpactedDeployment {
            deployment,
            policy: policy.name(),
            rewrites,
        }))
    }

    /// All deployments across namespaces, skipping namespaces that fail to list.
    async fn deployments(&self) -> Result<Vec<Deployment>, ClusterError> {
        let namespaces = self.reader.namespaces().await.map_err(|e| {
            tracing::error!(error = %e, "failed to get namespaces");
            e
        })?;

        let mut all = Vec::new();
        for namespace in namespaces {
            match self.reader.deployments(&namespace).await {
                Ok(deployments) => all.extend(deployments),
                Err(e) => {
                    tracing::error!(error = %e, namespace = %namespace, "failed to list deployments");
                }
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
#[path = "impact_tests.rs"]
mod tests;
