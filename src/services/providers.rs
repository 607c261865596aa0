// AI Provider Service
// HTTP plumbing for the generative classifier (Gemini) and the entity-recognition service

use crate::models::RecognizedEntity;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Endpoint not configured")]
    MissingEndpoint,
}

impl ProviderError {
    /// HTTP 429 or a quota message in the error body
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::ApiError { status, message } => {
                *status == 429 || {
                    let lower = message.to_lowercase();
                    lower.contains("quota") || lower.contains("resource_exhausted")
                }
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
struct RecognizeRequest<'a> {
    text: &'a str,
    labels: &'a [String],
    threshold: f64,
}

/// The inference service may answer with a bare array or wrap it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecognizeResponse {
    Entities(Vec<RecognizedEntity>),
    Wrapped { entities: Vec<RecognizedEntity> },
}

pub struct ProviderClient {
    client: Client,
    gemini_url: String,
}

impl ProviderClient {
    pub fn new(timeout_secs: Option<u64>, proxy_url: Option<&str>) -> Result<Self, ProviderError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)));
        if let Some(url) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        let client = builder.build()?;

        let gemini_url =
            env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string());

        Ok(Self { client, gemini_url })
    }

    pub fn with_gemini_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_url = url.into();
        self
    }

    pub fn gemini_url(&self) -> &str {
        &self.gemini_url
    }

    /// Single-turn `generateContent` call returning the first candidate's text
    pub fn call_gemini(&self, model: &str, api_key: &str, prompt: &str) -> Result<ChatResult, ProviderError> {
        let url = format!("{}/{}:generateContent", self.gemini_url.trim_end_matches('/'), model);
        let request = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.0, "maxOutputTokens": 64},
            "safetySettings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE"}
            ]
        });

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited(body));
            }
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        // {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
        let data: serde_json::Value = response
            .json()
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult { content, latency_ms })
    }

    /// POST `{text, labels, threshold}` to an entity-recognition endpoint
    pub fn call_recognizer(
        &self,
        endpoint: &str,
        text: &str,
        labels: &[String],
        threshold: f64,
    ) -> Result<Vec<RecognizedEntity>, ProviderError> {
        let request = RecognizeRequest { text, labels, threshold };

        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text()?;
        parse_recognizer_response(&body)
    }

    /// `GET <endpoint>/health` answered with a success status
    pub fn probe(&self, endpoint: &str) -> bool {
        let url = format!("{}/health", endpoint.trim_end_matches('/'));
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

pub(crate) fn parse_recognizer_response(body: &str) -> Result<Vec<RecognizedEntity>, ProviderError> {
    let parsed: RecognizeResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::JsonError(e.to_string()))?;
    Ok(match parsed {
        RecognizeResponse::Entities(entities) => entities,
        RecognizeResponse::Wrapped { entities } => entities,
    })
}

/// Extract JSON from response content
pub fn extract_json(content: &str) -> Result<String, ProviderError> {
    let content = content.trim();
    if content.starts_with('{') {
        Ok(content.to_string())
    } else if let Some(start) = content.find('{') {
        if let Some(end) = content.rfind('}').filter(|end| *end > start) {
            Ok(content[start..=end].to_string())
        } else {
            Err(ProviderError::JsonError("Invalid JSON response".to_string()))
        }
    } else {
        Err(ProviderError::JsonError("No JSON in response".to_string()))
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    let env_keys: &[&str] = match provider {
        "gemini" => &["GEMINI_API_KEY", "DADOSCAN_GEMINI_API_KEY"],
        _ => &[],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    if let Some(store) = super::ConfigStore::open_default() {
        if let Ok(Some(key)) = store.get_api_key(provider) {
            let key = key.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }

    None
}
