//! Webhook endpoints for host systems that render their own PDFs and want
//! this service to take over the actual rendering.
//!
//! A host posts either a template to render or HTML it already produced.
//! On success the response body is the raw PDF; on any render failure the
//! response is 204 No Content, telling the host to fall back to its own
//! renderer.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::application::error::ErrorReport;
use crate::application::sources::{PdfSource, PrerenderedHtmlSource, SourceError, TemplateSource};
use crate::domain::options::OptionSet;
use crate::domain::render::RenderOutcome;

use super::HttpState;
use super::models::RenderFailureBody;

/// A form-submission notification about to be turned into a PDF. Either a
/// custom template was picked, or the pre-rendered notification email body
/// is used as-is.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FormNotificationEvent {
    pub template: String,
    pub variables: Map<String, Value>,
    pub html: String,
}

/// An order document about to be turned into a PDF. A template is
/// mandatory here; orders have no pre-rendered fallback body.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct OrderPdfEvent {
    pub template: String,
    pub variables: Map<String, Value>,
    pub order_number: String,
}

pub async fn formie_render_pdf(
    State(state): State<HttpState>,
    Json(event): Json<FormNotificationEvent>,
) -> Response {
    let source: Box<dyn PdfSource> = if !event.template.is_empty() {
        Box::new(TemplateSource {
            template: event.template,
            variables: event.variables,
            include_error_detail: true,
        })
    } else {
        Box::new(PrerenderedHtmlSource { html: event.html })
    };

    render_for_host(&state, source.as_ref(), "formie").await
}

pub async fn commerce_render_pdf(
    State(state): State<HttpState>,
    Json(event): Json<OrderPdfEvent>,
) -> Response {
    if !event.order_number.is_empty() {
        tracing::debug!(
            target = "pdfmaker::hooks",
            order_number = %event.order_number,
            "rendering order PDF"
        );
    }

    // Order documents never expose engine detail in the substituted HTML.
    let source = TemplateSource {
        template: event.template,
        variables: event.variables,
        include_error_detail: false,
    };

    render_for_host(&state, &source, "commerce").await
}

async fn render_for_host(state: &HttpState, source: &dyn PdfSource, host: &'static str) -> Response {
    let html = match source.resolve_html(state.templates.as_ref()) {
        Ok(html) => html,
        Err(err @ SourceError::MissingTemplate) => {
            let mut response = (
                StatusCode::BAD_REQUEST,
                Json(RenderFailureBody {
                    success: false,
                    error: err.to_string(),
                }),
            )
                .into_response();
            ErrorReport::from_error("infra::http::hooks", StatusCode::BAD_REQUEST, &err)
                .attach(&mut response);
            return response;
        }
    };

    // The hosts pass no filename and no options of their own.
    let outcome = state
        .pdf
        .pdf_from_html(&html, false, "", &OptionSet::new())
        .await;

    let artifact = match outcome {
        RenderOutcome::Success(artifact) if !artifact.file_url.is_empty() => artifact,
        RenderOutcome::Success(_) => return StatusCode::NO_CONTENT.into_response(),
        RenderOutcome::Failure(failure) => {
            warn!(
                target = "pdfmaker::hooks",
                host,
                error = %failure.error,
                "render failed, host falls back to its own PDF"
            );
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    match state.pdf.fetch_artifact(&artifact.file_url).await {
        Ok(bytes) => ([(CONTENT_TYPE, "application/pdf")], bytes).into_response(),
        Err(err) => {
            warn!(
                target = "pdfmaker::hooks",
                host,
                file_url = %artifact.file_url,
                error = %err,
                "artifact download failed, host falls back to its own PDF"
            );
            StatusCode::NO_CONTENT.into_response()
        }
    }
}
