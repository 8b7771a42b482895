//! # Skin Analysis
//!
//! Remote AI skin analysis behind the [`SkinAnalyzer`] capability, plus the
//! summarizer that turns the provider's JSON into the one-line text stored on
//! an entry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, Instrument};

use crate::config::SkinAnalysisConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::pipeline_errors::PipelineError;

const SERVICE: &str = "skin_analysis";

/// Submit a face photo, get the provider's structured result back.
#[async_trait]
pub trait SkinAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: Vec<u8>,
        filename: &str,
        mime: &str,
    ) -> Result<Value, PipelineError>;
}

/// AILabTools skin-analysis client.
#[derive(Debug, Clone)]
pub struct AiLabToolsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl AiLabToolsClient {
    /// # Errors
    ///
    /// [`AppError::Config`] when no API key is configured or the HTTP client
    /// cannot be built.
    pub fn new(config: &SkinAnalysisConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("AILABTOOLS_API_KEY must be set for skin analysis".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build skin analysis client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> PipelineError {
        if err.is_timeout() {
            PipelineError::Timeout {
                service: SERVICE.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            PipelineError::Upstream {
                service: SERVICE.to_string(),
                status: None,
                body: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl SkinAnalyzer for AiLabToolsClient {
    async fn analyze(
        &self,
        image: Vec<u8>,
        filename: &str,
        mime: &str,
    ) -> Result<Value, PipelineError> {
        let span = observability::pipeline_span("skin_analysis");
        let start_time = Instant::now();
        let image_size = image.len();

        let result = async {
            let part = reqwest::multipart::Part::bytes(image)
                .file_name(filename.to_string())
                .mime_str(mime)
                .map_err(|e| {
                    PipelineError::InvalidInput(format!("Invalid content type '{}': {}", mime, e))
                })?;
            let form = reqwest::multipart::Form::new().part("image", part);

            debug!(url = %self.api_url, filename = %filename, image_size_bytes = image_size, "Submitting skin analysis");

            let response = self
                .client
                .post(&self.api_url)
                .header("ailabapi-api-key", &self.api_key)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            let body = response.text().await.map_err(|e| self.transport_error(e))?;

            if !status.is_success() {
                return Err(PipelineError::Upstream {
                    service: SERVICE.to_string(),
                    status: Some(status.as_u16()),
                    body,
                });
            }

            serde_json::from_str::<Value>(&body).map_err(|e| PipelineError::Upstream {
                service: SERVICE.to_string(),
                status: Some(status.as_u16()),
                body: format!("Response is not valid JSON: {}", e),
            })
        }
        .instrument(span)
        .await;

        let duration = start_time.elapsed();
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_timeout() => "timeout",
            Err(_) => "upstream_error",
        };
        observability::record_remote_call_metrics(SERVICE, outcome, duration);

        match &result {
            Ok(_) => info!(
                duration_ms = duration.as_millis() as u64,
                image_size_bytes = image_size,
                "Skin analysis completed"
            ),
            Err(e) => error_logging::log_upstream_error(
                e,
                SERVICE,
                Some(&self.api_url),
                e.upstream_status(),
            ),
        }

        result
    }
}

const SKIN_TYPES: [&str; 4] = ["Oily", "Dry", "Normal", "Combination"];
const DEFAULT_SKIN_TYPE_INDEX: i64 = 2;

const CONCERNS: [(&str, &str); 9] = [
    ("acne", "Acne"),
    ("eye_pouch", "Eye Pouches"),
    ("dark_circle", "Dark Circles"),
    ("skin_spot", "Skin Spots"),
    ("mole", "Moles"),
    ("blackhead", "Blackheads"),
    ("forehead_wrinkle", "Forehead Wrinkles"),
    ("crows_feet", "Crow's Feet"),
    ("nasolabial_fold", "Nasolabial Folds"),
];

const PORE_AREAS: [(&str, &str); 4] = [
    ("pores_forehead", "forehead"),
    ("pores_left_cheek", "left cheek"),
    ("pores_right_cheek", "right cheek"),
    ("pores_jaw", "jaw"),
];

/// Render the provider's `result` object as one line of text, e.g.
/// `Skin Type: Oily | Detected: Acne, Moles | Visible pores on: forehead`.
///
/// Responses without a `result` object summarize to
/// `"Analysis completed successfully"`.
pub fn summarize_analysis(response: &Value) -> String {
    let Some(data) = response.get("result").filter(|v| v.is_object()) else {
        return "Analysis completed successfully".to_string();
    };

    let mut parts = Vec::new();

    if let Some(skin_type) = data.get("skin_type") {
        let index = skin_type
            .get("skin_type")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_SKIN_TYPE_INDEX);
        if let Some(label) = usize::try_from(index).ok().and_then(|i| SKIN_TYPES.get(i)) {
            parts.push(format!("Skin Type: {}", label));
        }
    }

    let concerns: Vec<&str> = CONCERNS
        .iter()
        .filter(|(key, _)| is_present(data, key))
        .map(|(_, label)| *label)
        .collect();
    if concerns.is_empty() {
        parts.push("No major concerns detected".to_string());
    } else {
        parts.push(format!("Detected: {}", concerns.join(", ")));
    }

    let pores: Vec<&str> = PORE_AREAS
        .iter()
        .filter(|(key, _)| is_present(data, key))
        .map(|(_, label)| *label)
        .collect();
    if !pores.is_empty() {
        parts.push(format!("Visible pores on: {}", pores.join(", ")));
    }

    parts.join(" | ")
}

fn is_present(data: &Value, key: &str) -> bool {
    data.get(key)
        .and_then(|attr| attr.get("value"))
        .and_then(Value::as_f64)
        == Some(1.0)
}
