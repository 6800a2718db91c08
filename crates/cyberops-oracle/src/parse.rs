//! Extraction of the structured payload from an oracle answer.

use cyberops_core::{CyberopsError, CyberopsResult};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

static FENCE: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn fence() -> &'static Regex {
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("Invalid code fence pattern")
    })
}

/// Strip a markdown code fence (```` ```json ... ``` ````) around the payload.
///
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    match fence().captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Parse an oracle answer into a JSON value.
pub fn parse_decision(raw: &str) -> CyberopsResult<serde_json::Value> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|e| {
        CyberopsError::Parse(format!("oracle answer is not valid JSON: {e}"))
    })
}

/// Interpret an already parsed decision as a typed shape.
pub fn decision_as<T: DeserializeOwned>(value: serde_json::Value) -> CyberopsResult<T> {
    serde_json::from_value(value).map_err(|e| {
        CyberopsError::Parse(format!("oracle answer has an unexpected shape: {e}"))
    })
}
