use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::time::sleep;
use tracing::instrument;
use uuid::Uuid;

use crate::types::{ExplanationGenerator, ExplanationPayload, Judge, JudgeError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic Messages API backend for both the adversarial judge and the
/// explanation generator.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, timeout_ms: u64, max_retries: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            api_key,
            model,
            max_retries,
        }
    }

    fn extract_text_content(response_body: &serde_json::Value) -> Result<&str, JudgeError> {
        let content_arr = response_body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| JudgeError::Api("Missing or invalid 'content' field".into()))?;

        content_arr
            .iter()
            .find(|item| item["type"] == "text")
            .and_then(|item| item["text"].as_str())
            .ok_or(JudgeError::EmptyCompletion)
    }

    async fn complete(&self, system: &str, user_content: String) -> Result<String, JudgeError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": system,
            "messages": [
                {
                    "role": "user",
                    "content": user_content
                }
            ]
        });

        let mut attempt = 0u32;
        loop {
            let send_result = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&payload)
                .send()
                .await;

            match send_result {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        if status.as_u16() == 429 && attempt < self.max_retries {
                            attempt += 1;
                            sleep(Duration::from_millis(150 * u64::from(attempt))).await;
                            continue;
                        }
                        return Err(JudgeError::HttpStatus {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    let response_body: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| JudgeError::Api(e.to_string()))?;
                    let text = Self::extract_text_content(&response_body)?;
                    if text.trim().is_empty() {
                        return Err(JudgeError::EmptyCompletion);
                    }
                    return Ok(text.to_string());
                }
                Err(e) => {
                    if e.is_timeout() {
                        if attempt < self.max_retries {
                            attempt += 1;
                            sleep(Duration::from_millis(150 * u64::from(attempt))).await;
                            continue;
                        }
                        return Err(JudgeError::Timeout);
                    }
                    if attempt < self.max_retries {
                        attempt += 1;
                        sleep(Duration::from_millis(150 * u64::from(attempt))).await;
                        continue;
                    }
                    return Err(JudgeError::Api(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl Judge for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn verdict(&self, rubric: &str, claim: &serde_json::Value) -> Result<String, JudgeError> {
        let user_prompt = json!({
            "request_id": Uuid::new_v4(),
            "claim": claim,
        });
        self.complete(rubric, serde_json::to_string(&user_prompt)?)
            .await
    }
}

#[async_trait]
impl ExplanationGenerator for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, context: &serde_json::Value) -> Result<String, JudgeError> {
        let schemars_schema = schemars::schema_for!(ExplanationPayload);
        let schema_json = serde_json::to_string_pretty(&schemars_schema)?;

        let system = format!(
            r#"You are the explanation writer for a prediction market trading bot.
Given the market snapshot, the recommendation numbers, and both thesis summaries,
write the trader-facing rationale. You must output strictly valid JSON conforming
to the schema below. Do NOT output any markdown blocks or conversational text.
JUST the JSON object.

JSON Schema:
{}
"#,
            schema_json
        );

        let user_prompt = json!({
            "request_id": Uuid::new_v4(),
            "context": context,
        });
        self.complete(&system, serde_json::to_string(&user_prompt)?)
            .await
    }
}
