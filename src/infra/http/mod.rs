mod handlers;
mod hooks;
mod middleware;
pub mod models;

use std::sync::Arc;

use axum::{Router, http::StatusCode, middleware as axum_middleware, routing::get, routing::post};

use crate::application::pdf::PdfService;
use crate::application::templates::TemplateRenderer;
use crate::config::IntegrationSettings;
use crate::domain::options::RenderOptionDefaults;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub pdf: Arc<PdfService>,
    pub templates: Arc<dyn TemplateRenderer>,
    pub defaults: Arc<RenderOptionDefaults>,
}

/// Assemble the service router. The integration hook routes are mounted
/// only when the corresponding settings flag is on.
pub fn build_router(state: HttpState, integrations: IntegrationSettings) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(health))
        .route("/pdf/from-html", post(handlers::pdf_from_html))
        .route("/pdf/from-template", post(handlers::pdf_from_template))
        .route("/pdf/from-url", post(handlers::pdf_from_url))
        .route("/pdf/merge", post(handlers::merge))
        .route("/image/from-html", post(handlers::image_from_html))
        .route("/image/from-template", post(handlers::image_from_template))
        .route("/image/from-url", post(handlers::image_from_url));

    if integrations.formie {
        router = router.route("/hooks/formie/render-pdf", post(hooks::formie_render_pdf));
    }
    if integrations.commerce {
        router = router.route(
            "/hooks/commerce/render-pdf",
            post(hooks::commerce_render_pdf),
        );
    }

    router
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
