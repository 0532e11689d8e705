//! Registry of discovered workflows.
//!
//! Each id maps to an async once-cell, so concurrent registrations of the same
//! id share one in-flight discovery. A failed discovery leaves the cell empty
//! and the id can be registered again. A discovered definition is never
//! replaced.

use std::sync::{Arc, Mutex};

use herald_schema::SchemaValidator;
use indexmap::IndexMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::definition::WorkflowDefinition;
use crate::discovery::discover_workflow;
use crate::error::FrameworkError;
use crate::workflow::Workflow;

type Slot = Arc<OnceCell<Arc<WorkflowDefinition>>>;

pub struct Registry {
  workflows: Mutex<IndexMap<String, Slot>>,
  validator: Arc<SchemaValidator>,
}

impl Registry {
  pub fn new(validator: Arc<SchemaValidator>) -> Self {
    Self {
      workflows: Mutex::new(IndexMap::new()),
      validator,
    }
  }

  /// Discover and store a workflow, or return the existing definition.
  pub async fn register(&self, workflow: &Workflow) -> Result<Arc<WorkflowDefinition>, FrameworkError> {
    let slot = {
      let mut workflows = self.workflows.lock().unwrap_or_else(|e| e.into_inner());
      Arc::clone(workflows.entry(workflow.id.clone()).or_default())
    };

    if slot.initialized() {
      debug!(workflow_id = %workflow.id, "workflow_already_discovered");
    }

    slot
      .get_or_try_init(|| async {
        discover_workflow(workflow, Arc::clone(&self.validator))
          .await
          .map(Arc::new)
      })
      .await
      .cloned()
  }

  pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
    let workflows = self.workflows.lock().unwrap_or_else(|e| e.into_inner());
    workflows.get(workflow_id).and_then(|slot| slot.get().cloned())
  }

  /// Every discovered definition, in registration order.
  pub fn definitions(&self) -> Vec<Arc<WorkflowDefinition>> {
    let workflows = self.workflows.lock().unwrap_or_else(|e| e.into_inner());
    workflows
      .values()
      .filter_map(|slot| slot.get().cloned())
      .collect()
  }
}
