//! Single-consumer controller loop.
//!
//! Events are queued on a bounded channel and handled one at a time: the
//! resolve-and-apply cycle for an event completes before the next event is
//! taken, so no two cycles ever touch the same deployment concurrently.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::impact::{ImpactResolver, ImpactedDeployment};
use crate::config::ControllerConfig;
use crate::k8s::{ClusterReader, ClusterWriter, Event};

/// Provider name reported in logs.
pub const PROVIDER_NAME: &str = "kubernetes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Stopped,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Running => "running",
            ControllerState::Stopped => "stopped",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("controller is stopped")]
    Stopped,

    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,
}

/// Result of one resolve-and-apply cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Deployments the resolver proposed for update.
    pub impacted: usize,
    /// `namespace/name` of deployments written successfully.
    pub updated: Vec<String>,
    /// `namespace/name` of deployments whose write failed.
    pub failed: Vec<String>,
}

/// Cloneable submission and shutdown handle.
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::Sender<Event>,
    shutdown: CancellationToken,
    state: watch::Receiver<ControllerState>,
}

impl ControllerHandle {
    /// Enqueue an event, waiting while the queue is full.
    ///
    /// # Errors
    /// Returns `ControllerError::Stopped` once shutdown has been signalled.
    pub async fn submit(&self, event: Event) -> Result<(), ControllerError> {
        if self.shutdown.is_cancelled() {
            return Err(ControllerError::Stopped);
        }
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(ControllerError::Stopped),
            sent = self.events.send(event) => sent.map_err(|_| ControllerError::Stopped),
        }
    }

    /// Signal shutdown. Returns immediately; queued events are dropped.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Token that stops the controller when cancelled. Unlike a handle, it
    /// does not keep the queue open.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    /// Wait until the loop has exited, or the controller was dropped unstarted.
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        // The controller publishes `Stopped` before its sender drops, so a
        // closed channel also means stopped.
        let _ = state.wait_for(|s| *s == ControllerState::Stopped).await;
    }

    /// Number of events waiting in the queue.
    pub fn queued(&self) -> usize {
        self.events.max_capacity() - self.events.capacity()
    }
}

/// Owns the event queue and drives the resolve-and-apply cycle.
pub struct Controller {
    resolver: ImpactResolver,
    writer: Arc<dyn ClusterWriter>,
    events: mpsc::Receiver<Event>,
    shutdown: CancellationToken,
    state: watch::Sender<ControllerState>,
    span: tracing::Span,
}

impl Controller {
    /// Build a controller and its handle. The controller starts in `Running`.
    ///
    /// # Errors
    /// Returns `ControllerError::ZeroCapacity` for an empty queue.
    pub fn new(
        reader: Arc<dyn ClusterReader>,
        writer: Arc<dyn ClusterWriter>,
        config: &ControllerConfig,
    ) -> Result<(Self, ControllerHandle), ControllerError> {
        if config.queue_capacity == 0 {
            return Err(ControllerError::ZeroCapacity);
        }

        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity);
        let (state_tx, state_rx) = watch::channel(ControllerState::Running);
        let shutdown = CancellationToken::new();

        let span = tracing::info_span!("controller", provider = PROVIDER_NAME);
        let controller = Self {
            resolver: ImpactResolver::new(reader)
                .with_span(resolver_span(&span))
                .with_update_annotations(config.update_annotations),
            writer,
            events: events_rx,
            shutdown: shutdown.clone(),
            state: state_tx,
            span,
        };
        let handle = ControllerHandle {
            events: events_tx,
            shutdown,
            state: state_rx,
        };
        Ok((controller, handle))
    }

    /// Run the loop inside `span`; the impact resolver logs under a child of it.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.resolver.set_span(resolver_span(&span));
        self.span = span;
        self
    }

    /// Run the loop until shutdown is signalled or every handle is dropped.
    pub async fn start(mut self) {
        let span = self.span.clone();
        async {
            tracing::info!("controller started, waiting for events");
            loop {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {
                        tracing::info!("got shutdown signal, stopping...");
                        break;
                    }
                    received = self.events.recv() => match received {
                        Some(event) => {
                            self.process_event(&event).await;
                        }
                        None => {
                            tracing::info!("all submitters gone, stopping...");
                            break;
                        }
                    },
                }
            }

            self.events.close();
            let dropped = std::iter::from_fn(|| self.events.try_recv().ok()).count();
            if dropped > 0 {
                tracing::warn!(dropped, "dropping queued events on shutdown");
            }
            self.state.send_replace(ControllerState::Stopped);
        }
        .instrument(span)
        .await
    }

    /// Resolve impacted deployments for one event and apply them.
    pub async fn process_event(&self, event: &Event) -> EventOutcome {
        tracing::info!(
            repository = %event.repository_name,
            tag = %event.tag,
            registry = %event.registry_host,
            "processing event"
        );
        metrics::counter!("imagepilot_events_processed_total").increment(1);

        let outcome = self.resolve_and_apply(event).await;
        tracing::info!(
            repository = %event.repository_name,
            tag = %event.tag,
            impacted = outcome.impacted,
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            "event processed"
        );
        outcome
    }

    async fn resolve_and_apply(&self, event: &Event) -> EventOutcome {
        let impacted = match self.resolver.impacted_deployments(event).await {
            Ok(impacted) => impacted,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    image = %event.repository_name,
                    tag = %event.tag,
                    "failed to process event"
                );
                return EventOutcome::default();
            }
        };

        if impacted.is_empty() {
            tracing::info!(
                image = %event.repository_name,
                tag = %event.tag,
                "no impacted deployments found for this event"
            );
            return EventOutcome::default();
        }

        self.update_deployments(impacted).await
    }

    /// Apply each deployment independently; a failed write does not stop the batch.
    async fn update_deployments(&self, impacted: Vec<ImpactedDeployment>) -> EventOutcome {
        let mut outcome = EventOutcome {
            impacted: impacted.len(),
            ..Default::default()
        };

        for item in impacted {
            let deployment = item.deployment;
            match self.writer.update(&deployment).await {
                Ok(()) => {
                    tracing::info!(
                        name = %deployment.name,
                        namespace = %deployment.namespace,
                        policy = %item.policy,
                        "deployment updated"
                    );
                    metrics::counter!("imagepilot_deployments_updated_total").increment(1);
                    outcome.updated.push(deployment.key());
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        namespace = %deployment.namespace,
                        deployment = %deployment.name,
                        "got error while updating deployment"
                    );
                    metrics::counter!("imagepilot_update_failures_total").increment(1);
                    outcome.failed.push(deployment.key());
                }
            }
        }

        outcome
    }
}

fn resolver_span(parent: &tracing::Span) -> tracing::Span {
    tracing::info_span!(parent: parent, "impact_resolver")
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.state.send_replace(ControllerState::Stopped);
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
