use serde::{Deserialize, Serialize};

/// Remote service that backs the Decision Oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Google Gemini `generateContent` API.
    Gemini,
}

/// Connection settings for the Decision Oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: OracleProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// May be left empty in the config file and supplied through the environment.
    #[serde(default)]
    pub api_key: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> OracleProvider {
    OracleProvider::Gemini
}

fn default_model_id() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    60
}

impl OracleConfig {
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                OracleProvider::Gemini => "https://generativelanguage.googleapis.com",
            }
        }
    }

    /// Name of the environment variable that can carry the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self.provider {
            OracleProvider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}
