//! Render dispatcher: validates inputs, guards against unreachable local
//! URLs, resolves template input to HTML, and forwards exactly one call per
//! request to the hosted rendering API.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::application::templates::{TemplateError, TemplateRenderer};
use crate::domain::options::OptionSet;
use crate::domain::render::{RenderArtifact, RenderFailure, RenderOutcome};
use crate::domain::urls::is_local_url;

/// Error raised by the rendering API client. The message surfaces to
/// callers verbatim, matching the API's own error bodies.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RenderApiError {
    pub message: String,
}

impl RenderApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The hosted rendering API's operations, one method per remote endpoint.
#[async_trait]
pub trait RenderApi: Send + Sync {
    async fn url_to_pdf(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError>;

    async fn html_to_pdf(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError>;

    async fn url_to_image(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError>;

    async fn html_to_image(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError>;

    /// Merge several already-hosted PDFs into one. The remote merge
    /// operation accepts no options parameter.
    async fn merge(
        &self,
        urls: &[String],
        inline: bool,
        filename: &str,
    ) -> Result<RenderArtifact, RenderApiError>;

    /// Download the raw bytes of a generated artifact.
    async fn download(&self, file_url: &str) -> Result<Bytes, RenderApiError>;
}

#[derive(Clone)]
pub struct PdfService {
    api: Arc<dyn RenderApi>,
    templates: Arc<dyn TemplateRenderer>,
}

impl PdfService {
    pub fn new(api: Arc<dyn RenderApi>, templates: Arc<dyn TemplateRenderer>) -> Self {
        Self { api, templates }
    }

    pub async fn pdf_from_url(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        if url.is_empty() {
            return RenderFailure::no_url().into();
        }
        if is_local_url(url) {
            counter!("pdfmaker_local_url_rejected_total").increment(1);
            return RenderFailure::local_url(url).into();
        }

        self.forward("pdf_from_url", self.api.url_to_pdf(url, inline, filename, options))
            .await
    }

    pub async fn pdf_from_html(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        if html.is_empty() {
            return RenderFailure::no_html().into();
        }

        self.forward(
            "pdf_from_html",
            self.api.html_to_pdf(html, inline, filename, options),
        )
        .await
    }

    pub async fn pdf_from_template(
        &self,
        template: &str,
        variables: &Map<String, Value>,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        let html = match self.html_from_template(template, variables) {
            Ok(html) => html,
            Err(failure) => return failure.into(),
        };

        self.forward(
            "pdf_from_template",
            self.api.html_to_pdf(&html, inline, filename, options),
        )
        .await
    }

    pub async fn image_from_url(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        if url.is_empty() {
            return RenderFailure::no_url().into();
        }
        if is_local_url(url) {
            counter!("pdfmaker_local_url_rejected_total").increment(1);
            return RenderFailure::local_url(url).into();
        }

        self.forward(
            "image_from_url",
            self.api.url_to_image(url, inline, filename, options),
        )
        .await
    }

    pub async fn image_from_html(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        if html.is_empty() {
            return RenderFailure::no_html().into();
        }

        self.forward(
            "image_from_html",
            self.api.html_to_image(html, inline, filename, options),
        )
        .await
    }

    pub async fn image_from_template(
        &self,
        template: &str,
        variables: &Map<String, Value>,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> RenderOutcome {
        let html = match self.html_from_template(template, variables) {
            Ok(html) => html,
            Err(failure) => return failure.into(),
        };

        self.forward(
            "image_from_template",
            self.api.html_to_image(&html, inline, filename, options),
        )
        .await
    }

    /// Merge the given hosted PDFs into one document. Every URL is checked
    /// against the local-URL guard before any network call is made.
    pub async fn merge(&self, urls: &[String], inline: bool, filename: &str) -> RenderOutcome {
        if urls.is_empty() {
            return RenderFailure::no_urls().into();
        }

        for url in urls {
            if is_local_url(url) {
                counter!("pdfmaker_local_url_rejected_total").increment(1);
                return RenderFailure::local_url(url).into();
            }
        }

        self.forward("merge", self.api.merge(urls, inline, filename))
            .await
    }

    /// Fetch the raw bytes of a generated artifact, used for inline
    /// delivery and the integration hooks.
    pub async fn fetch_artifact(&self, file_url: &str) -> Result<Bytes, RenderApiError> {
        self.api.download(file_url).await
    }

    /// Resolve a template name plus variables into HTML, enforcing the
    /// four-outcome contract of the template collaborator.
    fn html_from_template(
        &self,
        template: &str,
        variables: &Map<String, Value>,
    ) -> Result<String, RenderFailure> {
        if template.is_empty() {
            return Err(RenderFailure::no_template());
        }
        if !self.templates.exists(template) {
            return Err(RenderFailure::template_not_found());
        }

        let html = match self.templates.render(template, variables) {
            Ok(html) => html,
            Err(TemplateError::NotFound { .. }) => return Err(RenderFailure::template_not_found()),
            Err(TemplateError::Render { message }) => return Err(RenderFailure::new(message)),
        };

        if html.is_empty() {
            return Err(RenderFailure::template_empty());
        }

        Ok(html)
    }

    async fn forward(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<RenderArtifact, RenderApiError>>,
    ) -> RenderOutcome {
        counter!("pdfmaker_render_requests_total", "operation" => operation).increment(1);

        match call.await {
            Ok(artifact) => {
                debug!(
                    target = "pdfmaker::pdf",
                    operation,
                    file_url = %artifact.file_url,
                    seconds = artifact.seconds,
                    "render completed"
                );
                RenderOutcome::Success(artifact)
            }
            Err(err) => {
                counter!("pdfmaker_render_failures_total", "operation" => operation).increment(1);
                debug!(target = "pdfmaker::pdf", operation, error = %err, "render failed");
                RenderOutcome::failure(err.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    impl RecordingApi {
        fn artifact() -> RenderArtifact {
            RenderArtifact {
                file_url: "https://storage.example/out.pdf".into(),
                seconds: 1.2,
                mb_out: 0.4,
                cost: 0.001,
                response_id: "resp-1".into(),
            }
        }

        fn record(&self, call: String) -> Result<RenderArtifact, RenderApiError> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(message) => Err(RenderApiError::new(message.clone())),
                None => Ok(Self::artifact()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RenderApi for RecordingApi {
        async fn url_to_pdf(
            &self,
            url: &str,
            _inline: bool,
            _filename: &str,
            _options: &OptionSet,
        ) -> Result<RenderArtifact, RenderApiError> {
            self.record(format!("url_to_pdf:{url}"))
        }

        async fn html_to_pdf(
            &self,
            html: &str,
            _inline: bool,
            _filename: &str,
            _options: &OptionSet,
        ) -> Result<RenderArtifact, RenderApiError> {
            self.record(format!("html_to_pdf:{html}"))
        }

        async fn url_to_image(
            &self,
            url: &str,
            _inline: bool,
            _filename: &str,
            _options: &OptionSet,
        ) -> Result<RenderArtifact, RenderApiError> {
            self.record(format!("url_to_image:{url}"))
        }

        async fn html_to_image(
            &self,
            html: &str,
            _inline: bool,
            _filename: &str,
            _options: &OptionSet,
        ) -> Result<RenderArtifact, RenderApiError> {
            self.record(format!("html_to_image:{html}"))
        }

        async fn merge(
            &self,
            urls: &[String],
            _inline: bool,
            _filename: &str,
        ) -> Result<RenderArtifact, RenderApiError> {
            self.record(format!("merge:{}", urls.join(",")))
        }

        async fn download(&self, _file_url: &str) -> Result<Bytes, RenderApiError> {
            Ok(Bytes::from_static(b"%PDF-1.7"))
        }
    }

    struct EmptyTemplates;

    impl TemplateRenderer for EmptyTemplates {
        fn exists(&self, _name: &str) -> bool {
            false
        }

        fn render(
            &self,
            name: &str,
            _variables: &Map<String, Value>,
        ) -> Result<String, TemplateError> {
            Err(TemplateError::not_found(name))
        }
    }

    struct FixedTemplates {
        html: String,
    }

    impl TemplateRenderer for FixedTemplates {
        fn exists(&self, _name: &str) -> bool {
            true
        }

        fn render(
            &self,
            _name: &str,
            _variables: &Map<String, Value>,
        ) -> Result<String, TemplateError> {
            Ok(self.html.clone())
        }
    }

    fn service_with(api: Arc<RecordingApi>) -> PdfService {
        PdfService::new(api, Arc::new(EmptyTemplates))
    }

    fn variables() -> Map<String, Value> {
        match json!({"name": "x"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn empty_html_fails_without_a_network_call() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service.pdf_from_html("", false, "", &OptionSet::new()).await;

        assert_eq!(outcome, RenderOutcome::failure("No HTML provided."));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn html_render_succeeds_with_artifact_reference() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service
            .pdf_from_html("<p>x</p>", false, "x.pdf", &OptionSet::new())
            .await;

        match outcome {
            RenderOutcome::Success(artifact) => {
                assert!(!artifact.file_url.is_empty());
                assert_eq!(artifact.response_id, "resp-1");
            }
            RenderOutcome::Failure(failure) => panic!("unexpected failure: {}", failure.error),
        }
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn local_urls_are_rejected_before_the_network() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service
            .pdf_from_url("http://localhost:8080/x", false, "", &OptionSet::new())
            .await;

        match outcome {
            RenderOutcome::Failure(failure) => {
                assert!(failure.error.contains("local URL provided"));
                assert!(failure.error.contains("http://localhost:8080/x"));
            }
            RenderOutcome::Success(_) => panic!("local url must not succeed"),
        }
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_urls_pass_through_to_fail_remotely() {
        let api = Arc::new(RecordingApi {
            fail_with: Some("Invalid url".into()),
            ..Default::default()
        });
        let service = service_with(api.clone());

        let outcome = service
            .pdf_from_url("not a url", false, "", &OptionSet::new())
            .await;

        assert_eq!(outcome, RenderOutcome::failure("Invalid url"));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn merge_rejects_empty_list() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service.merge(&[], false, "merged.pdf").await;

        assert_eq!(outcome, RenderOutcome::failure("No URLs provided."));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn merge_rejects_any_local_url_before_the_network() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let urls = vec![
            "http://localhost/a.pdf".to_string(),
            "https://ok.com/b.pdf".to_string(),
        ];
        let outcome = service.merge(&urls, false, "merged.pdf").await;

        match outcome {
            RenderOutcome::Failure(failure) => {
                assert!(failure.error.contains("http://localhost/a.pdf"));
            }
            RenderOutcome::Success(_) => panic!("merge with local url must fail"),
        }
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn template_miss_never_reaches_the_network() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service
            .pdf_from_template("missing", &variables(), false, "", &OptionSet::new())
            .await;

        assert_eq!(outcome, RenderOutcome::failure("No template found."));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_template_name_is_rejected() {
        let api = Arc::new(RecordingApi::default());
        let service = service_with(api.clone());

        let outcome = service
            .image_from_template("", &variables(), false, "", &OptionSet::new())
            .await;

        assert_eq!(outcome, RenderOutcome::failure("No template provided."));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_rendered_output_is_rejected() {
        let api = Arc::new(RecordingApi::default());
        let service = PdfService::new(
            api.clone(),
            Arc::new(FixedTemplates {
                html: String::new(),
            }),
        );

        let outcome = service
            .pdf_from_template("blank", &variables(), false, "", &OptionSet::new())
            .await;

        assert_eq!(
            outcome,
            RenderOutcome::failure("Template could not be rendered.")
        );
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn rendered_template_is_forwarded_as_html() {
        let api = Arc::new(RecordingApi::default());
        let service = PdfService::new(
            api.clone(),
            Arc::new(FixedTemplates {
                html: "<h1>invoice</h1>".into(),
            }),
        );

        let outcome = service
            .pdf_from_template("invoice", &variables(), false, "", &OptionSet::new())
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(
            api.calls.lock().unwrap().as_slice(),
            ["html_to_pdf:<h1>invoice</h1>"]
        );
    }

    #[tokio::test]
    async fn client_errors_become_failures_verbatim() {
        let api = Arc::new(RecordingApi {
            fail_with: Some("Unauthorized: bad api key".into()),
            ..Default::default()
        });
        let service = service_with(api.clone());

        let outcome = service
            .image_from_html("<p>x</p>", true, "x.pdf", &OptionSet::new())
            .await;

        assert_eq!(outcome, RenderOutcome::failure("Unauthorized: bad api key"));
    }
}
