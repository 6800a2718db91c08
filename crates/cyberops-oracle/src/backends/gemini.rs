use super::{DecisionOracle, FileReference};
use crate::config::OracleConfig;
use async_trait::async_trait;
use cyberops_core::{CyberopsError, CyberopsResult};
use std::time::Duration;
use tracing::debug;

/// Google Gemini `generateContent` backend.
pub struct GeminiOracle {
    config: OracleConfig,
    http: reqwest::Client,
}

impl GeminiOracle {
    pub fn new(config: OracleConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http }
    }

    async fn generate(&self, parts: Vec<serde_json::Value>) -> CyberopsResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url(),
            self.config.model_id
        );

        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            },
        });

        debug!(model = %self.config.model_id, "Submitting prompt to Gemini");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CyberopsError::Oracle(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CyberopsError::Oracle(e.to_string()))?;

        if !status.is_success() {
            return Err(CyberopsError::Oracle(format!(
                "Gemini API error {status}: {resp_body}"
            )));
        }

        extract_text(&resp_body)
    }
}

#[async_trait]
impl DecisionOracle for GeminiOracle {
    async fn submit(&self, prompt: &str) -> CyberopsResult<String> {
        self.generate(vec![serde_json::json!({ "text": prompt })])
            .await
    }

    async fn submit_with_files(
        &self,
        prompt: &str,
        files: &[FileReference],
    ) -> CyberopsResult<String> {
        let mut parts = vec![serde_json::json!({ "text": prompt })];
        for file in files {
            parts.push(serde_json::json!({
                "fileData": { "mimeType": file.mime_type, "fileUri": file.uri }
            }));
        }
        self.generate(parts).await
    }
}

/// Concatenate the text parts of the first candidate of a Gemini response.
pub fn extract_text(body: &serde_json::Value) -> CyberopsResult<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| CyberopsError::Oracle("Gemini returned no candidates".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(CyberopsError::Oracle("Gemini returned an empty answer".into()));
    }
    Ok(text)
}
