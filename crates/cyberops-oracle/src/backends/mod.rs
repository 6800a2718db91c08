pub mod gemini;

use async_trait::async_trait;
use cyberops_core::CyberopsResult;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiOracle;

/// An auxiliary file handed to the oracle to widen its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Location the remote service can read (e.g. an uploaded file URI).
    pub uri: String,
    pub mime_type: String,
}

impl FileReference {
    pub fn new(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Trait for Decision Oracle backends.
///
/// A backend only moves text: it returns the raw answer and leaves
/// structure extraction to [`crate::OracleClient`]. Transport and service
/// failures are reported as `CyberopsError::Oracle`.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Submit a prompt and return the raw text answer.
    async fn submit(&self, prompt: &str) -> CyberopsResult<String>;

    /// Submit a prompt together with file references.
    ///
    /// Backends without file support inline the references into the prompt.
    async fn submit_with_files(
        &self,
        prompt: &str,
        files: &[FileReference],
    ) -> CyberopsResult<String> {
        if files.is_empty() {
            return self.submit(prompt).await;
        }
        let mut full = String::from(prompt);
        full.push_str("\n\nReferenced files:\n");
        for file in files {
            full.push_str(&format!("- {} ({})\n", file.uri, file.mime_type));
        }
        self.submit(&full).await
    }
}
