//! Google Gemini backend (Generative Language `generateContent` API).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::LlmClient;
use crate::agent::truncate_for_log;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Backstop only; the agent bounds each call far more tightly.
const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, BASE_URL.to_string())
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(json: &Value) -> anyhow::Result<String> {
        let candidate = json["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .context("No candidates in Gemini response")?;

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
            anyhow::bail!("Gemini returned no text (finish reason: {})", reason);
        }

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, truncate_for_log(&body, 500));
        }

        let json: Value = resp
            .json()
            .await
            .context("Failed to decode Gemini response")?;

        if let Some(tokens) = json["usageMetadata"]["totalTokenCount"].as_u64() {
            tracing::debug!("Gemini usage: {} tokens", tokens);
        }

        Self::parse_response(&json)
    }
}
