//! Generative-AI API client
//!
//! Talks to a Gemini-style `generateContent` endpoint:
//! `POST {base_url}/v1beta/models/{model}:generateContent` with the API key
//! in the `x-goog-api-key` header. Every call asks for a JSON reply
//! (`responseMimeType: application/json`) and the text of the first
//! candidate is parsed as JSON.

use async_trait::async_trait;
use rollcall_common::ImageData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::prompts::{self, Part};
use super::{
    face_count_from_output, summary_from_output, DelegateError, FaceCountDelegate,
    RecognitionDelegate, RecognitionRequest, RecognitionResponse, SummaryDelegate, SummaryRequest,
};

const USER_AGENT: &str = concat!("Rollcall/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// HTTP client for the generative model
pub struct GenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GenAiClient {
    /// Build a client; `timeout` bounds each HTTP round-trip
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DelegateError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DelegateError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one user turn and return the reply parsed as JSON
    async fn generate_json(&self, operation: &str, parts: Vec<Part>) -> Result<Value, DelegateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DelegateError::Unavailable("no API key configured".to_string()))?;

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        tracing::debug!(operation, model = %self.model, "Calling generative model");

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(operation, status = status.as_u16(), "Generative model returned an error");
            return Err(DelegateError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&error_text, 200)
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DelegateError::TimedOut
                } else {
                    DelegateError::Malformed(format!("unreadable response envelope: {}", e))
                }
            })?;

        let text = reply_text(&reply)
            .ok_or_else(|| DelegateError::Malformed("response has no text candidate".to_string()))?;

        parse_json_text(&text)
    }
}

fn map_transport_error(e: reqwest::Error) -> DelegateError {
    if e.is_timeout() {
        DelegateError::TimedOut
    } else {
        DelegateError::Unavailable(e.to_string())
    }
}

fn reply_text(reply: &GenerateContentResponse) -> Option<String> {
    let content = reply.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse model text as JSON, tolerating a surrounding Markdown code fence
fn parse_json_text(text: &str) -> Result<Value, DelegateError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| DelegateError::Malformed(format!("reply is not JSON: {}", e)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl RecognitionDelegate for GenAiClient {
    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResponse, DelegateError> {
        let parts = prompts::recognition_parts(&request);
        let value = self.generate_json("recognize", parts).await?;
        Ok(RecognitionResponse::from_model_output(&value))
    }
}

#[async_trait]
impl FaceCountDelegate for GenAiClient {
    async fn count_faces(&self, photo: &ImageData) -> Result<u32, DelegateError> {
        let value = self
            .generate_json("count_faces", prompts::face_count_parts(photo))
            .await?;
        Ok(face_count_from_output(&value))
    }
}

#[async_trait]
impl SummaryDelegate for GenAiClient {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, DelegateError> {
        let value = self
            .generate_json("summarize", prompts::summary_parts(&request))
            .await?;
        summary_from_output(&value)
    }
}
