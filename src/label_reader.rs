//! # LLM Label Reader
//!
//! Optional alternative to OCR: ask a multimodal model to read the
//! ingredient list straight off the label photo.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, Instrument};

use crate::config::LabelReaderConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::pipeline_errors::PipelineError;

const SERVICE: &str = "label_reader";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const EXTRACTION_PROMPT: &str = "Extract the full list of ingredients from this product label. Format it as a clean, comma-separated list.";

#[async_trait]
pub trait LabelReader: Send + Sync {
    /// Ingredient names read from the label, lowercased and trimmed.
    async fn read_ingredients(&self, image: &[u8], mime: &str)
        -> Result<Vec<String>, PipelineError>;
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiLabelReader {
    client: reqwest::Client,
    key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiLabelReader {
    /// Returns `Ok(None)` when no API key is configured.
    pub fn from_config(config: &LabelReaderConfig) -> AppResult<Option<Self>> {
        let Some(key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build label reader client: {}", e)))?;

        Ok(Some(Self {
            client,
            key,
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
            timeout_secs: config.timeout_secs,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
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
impl LabelReader for GeminiLabelReader {
    async fn read_ingredients(
        &self,
        image: &[u8],
        mime: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let span = observability::pipeline_span("label_reader");
        let start_time = Instant::now();
        let url = self.endpoint();

        let result = async {
            let body = json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": EXTRACTION_PROMPT },
                        { "inline_data": { "mime_type": mime, "data": BASE64.encode(image) } }
                    ]
                }]
            });

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.key)
                .json(&body)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            let text = response.text().await.map_err(|e| self.transport_error(e))?;
            if !status.is_success() {
                return Err(PipelineError::Upstream {
                    service: SERVICE.to_string(),
                    status: Some(status.as_u16()),
                    body: text,
                });
            }

            let answer = extract_text(&text).ok_or_else(|| PipelineError::Upstream {
                service: SERVICE.to_string(),
                status: Some(status.as_u16()),
                body: "No text candidate in model response".to_string(),
            })?;
            Ok(split_model_list(&answer))
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
            Ok(items) => info!(
                model = %self.model,
                ingredients = items.len(),
                duration_ms = duration.as_millis() as u64,
                "Label read by model"
            ),
            Err(e) => {
                error_logging::log_upstream_error(e, SERVICE, Some(&url), e.upstream_status())
            }
        }

        result
    }
}

/// Lowercase, trim, split on commas. Items are trimmed individually too;
/// empty items are kept so the caller sees exactly what the model returned.
pub fn split_model_list(answer: &str) -> Vec<String> {
    answer
        .to_lowercase()
        .trim()
        .split(',')
        .map(|item| item.trim().to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

fn extract_text(body: &str) -> Option<String> {
    let payload: GeminiResponse = serde_json::from_str(body).ok()?;
    let content = payload.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
