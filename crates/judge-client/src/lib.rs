pub mod client;
pub mod types;

pub use client::AnthropicClient;
pub use types::{
    extract_json_object, parse_explanation, ExplanationGenerator, ExplanationPayload, Judge,
    JudgeError, RiskPerspective,
};
