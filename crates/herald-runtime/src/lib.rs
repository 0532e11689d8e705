//! Herald Runtime
//!
//! This crate runs host-authored notification workflows. A workflow is an
//! async body that invokes typed steps (email, sms, delay, custom, ...) in
//! order. The body runs in two modes:
//!
//! - **Discovery**: once per workflow at registration. Steps are recorded
//!   with their schemas and answered with mock results; nothing the host
//!   supplied is invoked.
//! - **Execution**: once per [`Event`](herald_config::Event). Only the
//!   event's target step is computed. Earlier steps are hydrated from the
//!   event's state, and anything after the target is never reached.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Client                             │
//! │  - add_workflows / discover / execute_workflow / get_code   │
//! └─────────────────────────────────────────────────────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │          Registry            │ │          Executor          │
//! │  - once-per-id discovery     │ │  - payload/controls checks │
//! │  - WorkflowDefinition        │ │  - step interception       │
//! └──────────────────────────────┘ │  - templated controls      │
//!                                  │  - provider resolution     │
//!                                  └────────────────────────────┘
//! ```

mod client;
mod definition;
mod discovery;
mod error;
mod execution;
mod provider;
mod registry;
mod schemas;
mod step;
mod workflow;

pub use client::{Client, ClientConfig};
pub use definition::{ProviderDefinition, StepDefinition, WorkflowDefinition};
pub use error::{BoxError, ErrorStatus, FrameworkError};
pub use herald_schema::Schema;
pub use provider::PASSTHROUGH_KEY;
pub use registry::Registry;
pub use step::{Provider, ProviderInput, Step, StepOptions};
pub use workflow::{Workflow, WorkflowBuilder, WorkflowContext};
