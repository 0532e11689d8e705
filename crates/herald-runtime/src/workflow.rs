//! Host-authored workflows.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use herald_config::{Subscriber, WorkflowPreferences};
use herald_schema::Schema;
use serde_json::Value;

use crate::step::Step;

pub(crate) type WorkflowBody =
  Arc<dyn Fn(WorkflowContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// What a workflow body receives.
#[derive(Clone)]
pub struct WorkflowContext {
  /// The validated trigger payload.
  pub payload: Value,
  pub subscriber: Subscriber,
  /// The validated workflow-level controls.
  pub controls: Value,
  pub step: Step,
}

/// A workflow as authored by the host: an async body invoking steps, plus
/// its schemas and defaults.
///
/// ```ignore
/// let workflow = Workflow::builder("welcome")
///   .payload_schema(json!({ "type": "object", "properties": { "name": { "type": "string" } } }))
///   .body(|ctx| async move {
///     ctx.step.email("send", |_| async { Ok(json!({ "subject": "Hi", "body": "..." })) }, StepOptions::new()).await?;
///     Ok(())
///   });
/// ```
#[derive(Clone)]
pub struct Workflow {
  pub(crate) id: String,
  pub(crate) body: WorkflowBody,
  pub(crate) payload_schema: Schema,
  pub(crate) controls_schema: Schema,
  pub(crate) preferences: WorkflowPreferences,
  pub(crate) tags: Vec<String>,
  pub(crate) code: String,
}

impl Workflow {
  pub fn builder(id: impl Into<String>) -> WorkflowBuilder {
    WorkflowBuilder {
      id: id.into(),
      payload_schema: Schema::any_object(),
      controls_schema: Schema::any_object(),
      preferences: WorkflowPreferences::default(),
      tags: Vec::new(),
      code: None,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }
}

pub struct WorkflowBuilder {
  id: String,
  payload_schema: Schema,
  controls_schema: Schema,
  preferences: WorkflowPreferences,
  tags: Vec<String>,
  code: Option<String>,
}

impl WorkflowBuilder {
  pub fn payload_schema(mut self, schema: impl Into<Schema>) -> Self {
    self.payload_schema = schema.into();
    self
  }

  pub fn controls_schema(mut self, schema: impl Into<Schema>) -> Self {
    self.controls_schema = schema.into();
    self
  }

  pub fn preferences(mut self, preferences: WorkflowPreferences) -> Self {
    self.preferences = preferences;
    self
  }

  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }

  pub fn tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags.extend(tags.into_iter().map(Into::into));
    self
  }

  /// Source text reported by `get_code`. Defaults to the body's type name.
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }

  pub fn body<F, Fut>(self, body: F) -> Workflow
  where
    F: Fn(WorkflowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
  {
    Workflow {
      code: self
        .code
        .unwrap_or_else(|| std::any::type_name::<F>().to_string()),
      id: self.id,
      body: Arc::new(move |ctx| body(ctx).boxed()),
      payload_schema: self.payload_schema,
      controls_schema: self.controls_schema,
      preferences: self.preferences,
      tags: self.tags,
    }
  }
}
