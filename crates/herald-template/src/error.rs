use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("failed to render template '{template}': {source}")]
  Render {
    template: String,
    #[source]
    source: minijinja::Error,
  },
}
