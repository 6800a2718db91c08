use crate::backends::{DecisionOracle, FileReference, GeminiOracle};
use crate::config::{OracleConfig, OracleProvider};
use crate::parse::parse_decision;
use cyberops_core::CyberopsResult;
use tracing::warn;

/// Oracle client that dispatches to the configured backend.
///
/// Answers are returned as parsed JSON; a non-JSON answer is a
/// `CyberopsError::Parse`, distinct from a failed call (`Oracle`).
pub struct OracleClient {
    backend: Box<dyn DecisionOracle>,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> Self {
        let backend: Box<dyn DecisionOracle> = match config.provider {
            OracleProvider::Gemini => Box::new(GeminiOracle::new(config)),
        };
        Self { backend }
    }

    /// Create from a pre-built backend (test doubles, custom services).
    pub fn from_backend(backend: Box<dyn DecisionOracle>) -> Self {
        Self { backend }
    }

    /// Submit a prompt and return the raw answer text.
    pub async fn submit(&self, prompt: &str) -> CyberopsResult<String> {
        self.backend.submit(prompt).await
    }

    /// Submit a prompt and parse the answer as JSON.
    pub async fn decide(&self, prompt: &str) -> CyberopsResult<serde_json::Value> {
        let raw = self.backend.submit(prompt).await?;
        parse_decision(&raw).inspect_err(|e| warn!(error = %e, "Unparseable oracle answer"))
    }

    /// Like [`decide`](Self::decide), with auxiliary file references.
    pub async fn decide_with_files(
        &self,
        prompt: &str,
        files: &[FileReference],
    ) -> CyberopsResult<serde_json::Value> {
        let raw = self.backend.submit_with_files(prompt, files).await?;
        parse_decision(&raw).inspect_err(|e| warn!(error = %e, "Unparseable oracle answer"))
    }
}
