//! PDF source capability used by the integration hooks.
//!
//! A host that wants its PDF rendered remotely supplies either a template
//! to render or HTML it has already produced (an email notification body,
//! an order confirmation). The dispatcher never learns which host is
//! calling; it only ever sees HTML.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::application::templates::{TemplateError, TemplateRenderer};

const RENDER_ERROR_NOTICE: &str = "An error occurred while generating this PDF.";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("PDF template file does not exist.")]
    MissingTemplate,
}

pub trait PdfSource: Send + Sync {
    fn resolve_html(&self, templates: &dyn TemplateRenderer) -> Result<String, SourceError>;
}

/// A template the host picked, rendered with the host's variables.
///
/// A render failure is substituted into the HTML rather than aborting, so
/// the host still receives a PDF describing the problem. Whether the
/// engine's message follows the notice is per-host: form notifications
/// show it, order documents get the bare notice.
pub struct TemplateSource {
    pub template: String,
    pub variables: Map<String, Value>,
    pub include_error_detail: bool,
}

impl PdfSource for TemplateSource {
    fn resolve_html(&self, templates: &dyn TemplateRenderer) -> Result<String, SourceError> {
        if self.template.is_empty() || !templates.exists(&self.template) {
            return Err(SourceError::MissingTemplate);
        }

        match templates.render(&self.template, &self.variables) {
            Ok(html) => Ok(html),
            Err(TemplateError::NotFound { .. }) => Err(SourceError::MissingTemplate),
            Err(TemplateError::Render { message }) => Ok(if self.include_error_detail {
                format!("{RENDER_ERROR_NOTICE} {message}")
            } else {
                RENDER_ERROR_NOTICE.to_string()
            }),
        }
    }
}

/// HTML the host already rendered on its own.
pub struct PrerenderedHtmlSource {
    pub html: String,
}

impl PdfSource for PrerenderedHtmlSource {
    fn resolve_html(&self, _templates: &dyn TemplateRenderer) -> Result<String, SourceError> {
        Ok(self.html.clone())
    }
}
