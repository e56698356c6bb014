//! Template rendering seam.
//!
//! The dispatcher only needs a collaborator that can say whether a template
//! exists and turn it plus a variable mapping into HTML; the engine behind
//! the trait is an infrastructure concern.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{name}` does not exist")]
    NotFound { name: String },
    #[error("{message}")]
    Render { message: String },
}

impl TemplateError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

pub trait TemplateRenderer: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    /// Render `name` with `variables` into an HTML string.
    fn render(&self, name: &str, variables: &Map<String, Value>) -> Result<String, TemplateError>;
}
