//! Herald Config
//!
//! This crate contains the serializable types that cross the boundary between
//! a Herald host and whatever transport carries invocations to it:
//! inbound [`Event`]s with their prior [`StepState`], and the
//! [`ExecuteOutput`], discovery, health and error documents sent back.
//!
//! The types carry no behavior. Validation, discovery and execution live in
//! `herald-runtime`; this crate only fixes the JSON shape (camelCase keys,
//! lowercase enum tags).

mod discover;
mod event;
mod output;
mod preferences;
mod step_kind;

pub use discover::{
  DiscoverOutput, DiscoverProviderOutput, DiscoverStepOptions, DiscoverStepOutput,
  DiscoverWorkflowOutput, SchemaOutput,
};
pub use event::{Action, Event, StepState, Subscriber};
pub use output::{
  CodeOutput, DiscoveredCount, ErrorResponse, ExecuteMetadata, ExecuteOptions, ExecuteOutput,
  ExecutionStatus, HealthCheck, HealthStatus,
};
pub use preferences::{ChannelPreference, WorkflowPreferences};
pub use step_kind::{ActionType, ChannelType, StepKind};
