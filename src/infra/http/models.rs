//! Request and response bodies for the render endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::options::OptionSet;
use crate::domain::render::{RenderArtifact, RenderFailure};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct HtmlRenderRequest {
    pub html: String,
    pub inline: bool,
    pub filename: String,
    pub options: OptionSet,
    pub redirect: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TemplateRenderRequest {
    pub template: String,
    pub variables: Map<String, Value>,
    pub inline: bool,
    pub filename: String,
    pub options: OptionSet,
    pub redirect: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UrlRenderRequest {
    pub url: String,
    pub inline: bool,
    pub filename: String,
    pub options: OptionSet,
    pub redirect: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MergeRequest {
    pub urls: Vec<String>,
    pub inline: bool,
    pub filename: String,
    pub options: OptionSet,
    pub redirect: bool,
}

/// JSON descriptor returned when neither redirect nor inline delivery was
/// requested (or inline delivery failed).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSuccessBody {
    pub success: bool,
    pub pdf: String,
    pub seconds: f64,
    pub mb_out: f64,
    pub cost: f64,
    pub response_id: String,
}

impl From<&RenderArtifact> for RenderSuccessBody {
    fn from(artifact: &RenderArtifact) -> Self {
        Self {
            success: true,
            pdf: artifact.file_url.clone(),
            seconds: artifact.seconds,
            mb_out: artifact.mb_out,
            cost: artifact.cost,
            response_id: artifact.response_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RenderFailureBody {
    pub success: bool,
    pub error: String,
}

impl From<RenderFailure> for RenderFailureBody {
    fn from(failure: RenderFailure) -> Self {
        Self {
            success: false,
            error: failure.error,
        }
    }
}
