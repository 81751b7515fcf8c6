use examination_engine::ExamConfig;
use recommendation_engine::SynthConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub examination: ExaminationConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExaminationConfig {
    #[serde(default = "default_survive_threshold")]
    pub survive_threshold: f64,
    #[serde(default = "default_refute_threshold")]
    pub refute_threshold: f64,
    #[serde(default = "default_disagreement_threshold")]
    pub disagreement_threshold: f64,
    #[serde(default = "default_max_concurrent_tests")]
    pub max_concurrent_tests: usize,
    #[serde(default = "default_judge_timeout_ms")]
    pub judge_timeout_ms: u64,
}

impl Default for ExaminationConfig {
    fn default() -> Self {
        Self {
            survive_threshold: default_survive_threshold(),
            refute_threshold: default_refute_threshold(),
            disagreement_threshold: default_disagreement_threshold(),
            max_concurrent_tests: default_max_concurrent_tests(),
            judge_timeout_ms: default_judge_timeout_ms(),
        }
    }
}

impl ExaminationConfig {
    pub fn to_engine_config(&self) -> ExamConfig {
        ExamConfig {
            survive_threshold: self.survive_threshold,
            refute_threshold: self.refute_threshold,
            disagreement_threshold: self.disagreement_threshold,
            max_concurrent_tests: self.max_concurrent_tests,
            judge_timeout_ms: self.judge_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_min_edge_threshold")]
    pub min_edge_threshold: f64,
    #[serde(default = "default_explanation_timeout_ms")]
    pub explanation_timeout_ms: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_edge_threshold: default_min_edge_threshold(),
            explanation_timeout_ms: default_explanation_timeout_ms(),
        }
    }
}

impl RecommendationConfig {
    pub fn to_engine_config(&self) -> SynthConfig {
        SynthConfig {
            min_edge_threshold: self.min_edge_threshold,
            explanation_timeout_ms: self.explanation_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_dir")]
    pub dir: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: default_journal_dir(),
        }
    }
}

fn default_survive_threshold() -> f64 {
    0.25
}

fn default_refute_threshold() -> f64 {
    -0.25
}

fn default_disagreement_threshold() -> f64 {
    0.3
}

fn default_max_concurrent_tests() -> usize {
    4
}

fn default_judge_timeout_ms() -> u64 {
    20_000
}

fn default_min_edge_threshold() -> f64 {
    0.05
}

fn default_explanation_timeout_ms() -> u64 {
    15_000
}

fn default_journal_dir() -> String {
    "AUDIT".into()
}

impl AppConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let raw = r#"
            [llm]
            provider = "anthropic"
            model = "claude-sonnet-4-20250514"
            timeout_ms = 30000
            max_retries = 2
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.recommendation.min_edge_threshold, 0.05);
        assert_eq!(config.examination.disagreement_threshold, 0.3);
        assert_eq!(config.journal.dir, "AUDIT");
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [llm]
            provider = "anthropic"
            model = "claude-sonnet-4-20250514"
            timeout_ms = 30000
            max_retries = 2

            [recommendation]
            min_edge_threshold = 0.08
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.recommendation.min_edge_threshold, 0.08);
        assert_eq!(config.recommendation.explanation_timeout_ms, 15_000);
    }
}
