//! Result values produced by the render dispatcher.

/// Pointer to a generated file hosted by the rendering API, plus the
/// metadata the API reports alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderArtifact {
    pub file_url: String,
    pub seconds: f64,
    pub mb_out: f64,
    pub cost: f64,
    pub response_id: String,
}

/// A failed render, carrying the message shown to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub error: String,
}

impl RenderFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn no_url() -> Self {
        Self::new("No URL provided.")
    }

    pub fn no_urls() -> Self {
        Self::new("No URLs provided.")
    }

    pub fn no_html() -> Self {
        Self::new("No HTML provided.")
    }

    pub fn no_template() -> Self {
        Self::new("No template provided.")
    }

    pub fn template_not_found() -> Self {
        Self::new("No template found.")
    }

    pub fn template_empty() -> Self {
        Self::new("Template could not be rendered.")
    }

    pub fn local_url(url: &str) -> Self {
        Self::new(format!(
            "Invalid URL: local URL provided, which the rendering service won't be able to access: {url}"
        ))
    }
}

/// Outcome of a dispatch: a hosted artifact or a terminal failure. Produced
/// per request, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Success(RenderArtifact),
    Failure(RenderFailure),
}

impl RenderOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(RenderFailure::new(error))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl From<RenderFailure> for RenderOutcome {
    fn from(failure: RenderFailure) -> Self {
        Self::Failure(failure)
    }
}
