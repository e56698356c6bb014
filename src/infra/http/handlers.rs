//! Render endpoints: normalize the request, dispatch, format the result.

use axum::{
    Json,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
};
use metrics::counter;
use tracing::warn;

use crate::domain::options::{OptionSet, OutputType};
use crate::domain::render::RenderOutcome;

use super::HttpState;
use super::models::{
    HtmlRenderRequest, MergeRequest, RenderFailureBody, RenderSuccessBody, TemplateRenderRequest,
    UrlRenderRequest,
};

pub async fn pdf_from_html(
    State(state): State<HttpState>,
    Json(request): Json<HtmlRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Pdf, &request.options);
    let outcome = state
        .pdf
        .pdf_from_html(&request.html, request.inline, &filename, &options)
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn pdf_from_template(
    State(state): State<HttpState>,
    Json(request): Json<TemplateRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Pdf, &request.options);
    let outcome = state
        .pdf
        .pdf_from_template(
            &request.template,
            &request.variables,
            request.inline,
            &filename,
            &options,
        )
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn pdf_from_url(
    State(state): State<HttpState>,
    Json(request): Json<UrlRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Pdf, &request.options);
    let outcome = state
        .pdf
        .pdf_from_url(&request.url, request.inline, &filename, &options)
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn merge(State(state): State<HttpState>, Json(request): Json<MergeRequest>) -> Response {
    let filename = normalize_filename(&request.filename);
    // Options are resolved for parity with the other endpoints but the
    // remote merge operation does not accept them.
    let _options = state.defaults.resolve(OutputType::Pdf, &request.options);
    let outcome = state
        .pdf
        .merge(&request.urls, request.inline, &filename)
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn image_from_html(
    State(state): State<HttpState>,
    Json(request): Json<HtmlRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Image, &request.options);
    let outcome = state
        .pdf
        .image_from_html(&request.html, request.inline, &filename, &options)
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn image_from_template(
    State(state): State<HttpState>,
    Json(request): Json<TemplateRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Image, &request.options);
    let outcome = state
        .pdf
        .image_from_template(
            &request.template,
            &request.variables,
            request.inline,
            &filename,
            &options,
        )
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

pub async fn image_from_url(
    State(state): State<HttpState>,
    Json(request): Json<UrlRenderRequest>,
) -> Response {
    let filename = normalize_filename(&request.filename);
    let options = state.defaults.resolve(OutputType::Image, &request.options);
    let outcome = state
        .pdf
        .image_from_url(&request.url, request.inline, &filename, &options)
        .await;

    respond(&state, outcome, request.redirect, request.inline, &filename).await
}

/// Append `.pdf` unless the name already ends with it, case-insensitively.
/// Applied to every endpoint, image ones included, and to empty names.
pub(super) fn normalize_filename(filename: &str) -> String {
    let mut normalized = filename.to_string();
    if !normalized.to_lowercase().ends_with(".pdf") {
        normalized.push_str(".pdf");
    }
    normalized
}

/// Three-way response formatting, in priority order: failure as JSON, then
/// redirect, then inline bytes, then the JSON success descriptor.
///
/// An inline delivery failure is deliberately swallowed and falls through
/// to the descriptor; the caller still learns where the artifact lives.
async fn respond(
    state: &HttpState,
    outcome: RenderOutcome,
    redirect: bool,
    inline: bool,
    filename: &str,
) -> Response {
    let artifact = match outcome {
        RenderOutcome::Failure(failure) => {
            return Json(RenderFailureBody::from(failure)).into_response();
        }
        RenderOutcome::Success(artifact) => artifact,
    };

    if redirect {
        return Redirect::to(&artifact.file_url).into_response();
    }

    if inline {
        match state.pdf.fetch_artifact(&artifact.file_url).await {
            Ok(bytes) => {
                let headers = [
                    (CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ];
                return (headers, bytes).into_response();
            }
            Err(err) => {
                counter!("pdfmaker_inline_delivery_failed_total").increment(1);
                warn!(
                    target = "pdfmaker::http",
                    file_url = %artifact.file_url,
                    error = %err,
                    "inline delivery failed, falling back to descriptor"
                );
            }
        }
    }

    Json(RenderSuccessBody::from(&artifact)).into_response()
}

#[cfg(test)]
mod tests {
    use super::normalize_filename;

    #[test]
    fn appends_pdf_suffix_when_missing() {
        assert_eq!(normalize_filename("invoice"), "invoice.pdf");
        assert_eq!(normalize_filename("report.v2"), "report.v2.pdf");
    }

    #[test]
    fn existing_suffix_is_kept_case_insensitively() {
        assert_eq!(normalize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(normalize_filename("INVOICE.PDF"), "INVOICE.PDF");
        assert_eq!(normalize_filename("mixed.Pdf"), "mixed.Pdf");
    }

    #[test]
    fn empty_name_becomes_bare_suffix() {
        assert_eq!(normalize_filename(""), ".pdf");
    }
}
