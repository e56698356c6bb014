//! reqwest client for the api2pdf v2 REST API.
//!
//! Every operation is a single POST with the API key in the Authorization
//! header; the service answers HTTP 200 with a `Success` flag and either an
//! artifact descriptor or an `Error` message.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::application::pdf::{RenderApi, RenderApiError};
use crate::config::ApiSettings;
use crate::domain::options::OptionSet;
use crate::domain::render::RenderArtifact;
use crate::infra::error::InfraError;

const CHROME_PDF_FROM_URL: &str = "/chrome/pdf/url";
const CHROME_PDF_FROM_HTML: &str = "/chrome/pdf/html";
const CHROME_IMAGE_FROM_URL: &str = "/chrome/image/url";
const CHROME_IMAGE_FROM_HTML: &str = "/chrome/image/html";
const PDFSHARP_MERGE: &str = "/pdfsharp/merge";

pub struct Api2PdfClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Api2PdfClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build API client: {err}"))
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.key.clone(),
        })
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<RenderArtifact, RenderApiError> {
        let url = format!("{}{path}", self.base_url);
        debug!(target = "pdfmaker::api2pdf", path, "calling rendering API");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| RenderApiError::new(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RenderApiError::new(format!(
                "rendering API returned {status}: {detail}"
            )));
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|err| RenderApiError::new(format!("malformed API response: {err}")))?;

        payload.into_artifact()
    }
}

#[async_trait]
impl RenderApi for Api2PdfClient {
    async fn url_to_pdf(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError> {
        self.post(
            CHROME_PDF_FROM_URL,
            json!({"url": url, "inline": inline, "fileName": filename, "options": options}),
        )
        .await
    }

    async fn html_to_pdf(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError> {
        self.post(
            CHROME_PDF_FROM_HTML,
            json!({"html": html, "inline": inline, "fileName": filename, "options": options}),
        )
        .await
    }

    async fn url_to_image(
        &self,
        url: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError> {
        self.post(
            CHROME_IMAGE_FROM_URL,
            json!({"url": url, "inline": inline, "fileName": filename, "options": options}),
        )
        .await
    }

    async fn html_to_image(
        &self,
        html: &str,
        inline: bool,
        filename: &str,
        options: &OptionSet,
    ) -> Result<RenderArtifact, RenderApiError> {
        self.post(
            CHROME_IMAGE_FROM_HTML,
            json!({"html": html, "inline": inline, "fileName": filename, "options": options}),
        )
        .await
    }

    async fn merge(
        &self,
        urls: &[String],
        inline: bool,
        filename: &str,
    ) -> Result<RenderArtifact, RenderApiError> {
        // The merge endpoint takes no options parameter.
        self.post(
            PDFSHARP_MERGE,
            json!({"urls": urls, "inline": inline, "fileName": filename}),
        )
        .await
    }

    async fn download(&self, file_url: &str) -> Result<Bytes, RenderApiError> {
        let response = self
            .http
            .get(file_url)
            .send()
            .await
            .map_err(|err| RenderApiError::new(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderApiError::new(format!(
                "artifact download returned {status}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|err| RenderApiError::new(err.to_string()))
    }
}

/// Wire shape of an api2pdf v2 response. The service emits PascalCase
/// keys; camelCase aliases are accepted for tolerance.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ApiResponse {
    #[serde(rename = "Success", alias = "success")]
    success: bool,
    #[serde(rename = "FileUrl", alias = "fileUrl")]
    file_url: Option<String>,
    #[serde(rename = "Seconds", alias = "seconds")]
    seconds: f64,
    #[serde(rename = "MbOut", alias = "mbOut")]
    mb_out: f64,
    #[serde(rename = "Cost", alias = "cost")]
    cost: f64,
    #[serde(rename = "ResponseId", alias = "responseId")]
    response_id: Option<String>,
    #[serde(rename = "Error", alias = "error")]
    error: Option<String>,
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self {
            success: false,
            file_url: None,
            seconds: 0.0,
            mb_out: 0.0,
            cost: 0.0,
            response_id: None,
            error: None,
        }
    }
}

impl ApiResponse {
    fn into_artifact(self) -> Result<RenderArtifact, RenderApiError> {
        if !self.success {
            let message = self
                .error
                .unwrap_or_else(|| "rendering API reported failure without a message".to_string());
            return Err(RenderApiError::new(message));
        }

        let file_url = self.file_url.ok_or_else(|| {
            RenderApiError::new("rendering API reported success without a file URL")
        })?;

        Ok(RenderArtifact {
            file_url,
            seconds: self.seconds,
            mb_out: self.mb_out,
            cost: self.cost,
            response_id: self.response_id.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_success_payload_parses() {
        let payload: ApiResponse = serde_json::from_str(
            r#"{
                "FileUrl": "https://storage.example/abc.pdf",
                "MbIn": 0.01,
                "MbOut": 0.12,
                "Cost": 0.00096,
                "Seconds": 2.18,
                "ResponseId": "d2f1a2b3",
                "Success": true
            }"#,
        )
        .expect("parse");

        let artifact = payload.into_artifact().expect("artifact");
        assert_eq!(artifact.file_url, "https://storage.example/abc.pdf");
        assert_eq!(artifact.response_id, "d2f1a2b3");
        assert_eq!(artifact.mb_out, 0.12);
    }

    #[test]
    fn failure_payload_surfaces_the_api_message() {
        let payload: ApiResponse =
            serde_json::from_str(r#"{"Success": false, "Error": "Invalid api key"}"#)
                .expect("parse");

        let err = payload.into_artifact().expect_err("must fail");
        assert_eq!(err.message, "Invalid api key");
    }

    #[test]
    fn success_without_file_url_is_an_error() {
        let payload: ApiResponse =
            serde_json::from_str(r#"{"Success": true}"#).expect("parse");

        assert!(payload.into_artifact().is_err());
    }
}
