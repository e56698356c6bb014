//! Handlebars-backed implementation of the template rendering seam.
//!
//! Templates are `.hbs` files under a configured directory, registered once
//! at startup and addressed by their relative path without the extension
//! (`invoices/order` for `invoices/order.hbs`).

use std::path::Path;

use handlebars::{DirectorySourceOptions, Handlebars};
use serde_json::{Map, Value};
use tracing::info;

use crate::application::templates::{TemplateError, TemplateRenderer};

use super::error::InfraError;

pub struct HandlebarsTemplates {
    registry: Handlebars<'static>,
}

impl HandlebarsTemplates {
    /// Register every template under `directory`. A missing directory is a
    /// configuration error; an empty one is allowed and simply renders
    /// nothing.
    pub fn from_directory(directory: &Path) -> Result<Self, InfraError> {
        if !directory.is_dir() {
            return Err(InfraError::configuration(format!(
                "templates directory `{}` does not exist",
                directory.display()
            )));
        }

        let mut registry = Handlebars::new();
        registry
            .register_templates_directory(directory, DirectorySourceOptions::default())
            .map_err(|err| {
                InfraError::configuration(format!(
                    "failed to register templates from `{}`: {err}",
                    directory.display()
                ))
            })?;

        info!(
            target = "pdfmaker::templates",
            directory = %directory.display(),
            count = registry.get_templates().len(),
            "registered templates"
        );

        Ok(Self { registry })
    }
}

impl TemplateRenderer for HandlebarsTemplates {
    fn exists(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    fn render(&self, name: &str, variables: &Map<String, Value>) -> Result<String, TemplateError> {
        if !self.registry.has_template(name) {
            return Err(TemplateError::not_found(name));
        }

        self.registry
            .render(name, variables)
            .map_err(|err| TemplateError::render(err.to_string()))
    }
}
