use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("API request failed: {0}")]
    Api(String),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Timeout")]
    Timeout,
    #[error("Empty completion")]
    EmptyCompletion,
}

/// Adversarial judge contract: a rubric plus a claim package in, a free-text
/// verdict out. May fail or time out; no other side effects assumed.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn verdict(&self, rubric: &str, claim: &serde_json::Value) -> Result<String, JudgeError>;
}

/// Explanation generator contract: a structured context in, raw text out.
/// The text is expected to contain a JSON object shaped like
/// [`ExplanationPayload`], possibly wrapped in prose or a fenced code block.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn generate(&self, context: &serde_json::Value) -> Result<String, JudgeError>;
}

/// Natural-language rationale attached to a trade recommendation.
///
/// Field names follow the generator wire contract (camelCase keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationPayload {
    pub summary: String,
    pub core_thesis: String,
    #[serde(default)]
    pub key_catalysts: Vec<String>,
    #[serde(default)]
    pub failure_scenarios: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_perspectives: Option<Vec<RiskPerspective>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskPerspective {
    pub philosophy: String,
    pub assessment: String,
}

/// Recover a JSON object from generator output. Tries, in order: a direct
/// parse, a fenced code block, and a bare first-`{`..last-`}` slice.
pub fn extract_json_object(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(block) = extract_fenced_block(raw) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(block.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&raw[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

fn extract_fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after = &raw[open + 3..];
    // Skip the info string ("json", "JSON", or empty).
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Parse and minimally validate an explanation payload from raw generator
/// output. Returns None when no usable payload is recoverable.
pub fn parse_explanation(raw: &str) -> Option<ExplanationPayload> {
    let value = extract_json_object(raw)?;
    let payload: ExplanationPayload = serde_json::from_value(value).ok()?;
    if payload.summary.trim().is_empty() || payload.core_thesis.trim().is_empty() {
        return None;
    }
    Some(payload)
}
