//! Event-driven update controller.
//!
//! `impact` decides which deployments an event touches; `worker` serializes
//! events through a bounded queue and applies the decisions.

pub mod impact;
pub mod worker;

pub use impact::{ImpactResolver, ImpactedDeployment, UPDATE_TIME_ANNOTATION};
pub use worker::{
    Controller, ControllerError, ControllerHandle, ControllerState, EventOutcome, PROVIDER_NAME,
};
