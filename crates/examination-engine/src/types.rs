use common::Side;
use serde::{Deserialize, Serialize};

/// The five adversarial dimensions a thesis is tested along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Evidence,
    Causality,
    Timing,
    Liquidity,
    TailRisk,
}

impl TestKind {
    pub const ALL: [TestKind; 5] = [
        TestKind::Evidence,
        TestKind::Causality,
        TestKind::Timing,
        TestKind::Liquidity,
        TestKind::TailRisk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Evidence => "evidence",
            TestKind::Causality => "causality",
            TestKind::Timing => "timing",
            TestKind::Liquidity => "liquidity",
            TestKind::TailRisk => "tail_risk",
        }
    }

    /// Timing and liquidity tests cannot be judged without market context.
    pub fn needs_market_context(self) -> bool {
        matches!(self, TestKind::Timing | TestKind::Liquidity)
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorical result of one examination test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Survived,
    Weakened,
    Refuted,
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestOutcome::Survived => write!(f, "survived"),
            TestOutcome::Weakened => write!(f, "weakened"),
            TestOutcome::Refuted => write!(f, "refuted"),
        }
    }
}

/// One adversarial test of one thesis. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExaminationTest {
    pub kind: TestKind,
    pub target: Side,
    /// In [-1, 1]; sign always agrees with the outcome.
    pub score: f64,
    pub outcome: TestOutcome,
    pub rationale: String,
}

/// Result of a full cross-examination cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub tests: Vec<ExaminationTest>,
    /// Mean score of tests targeting the bull thesis, in [-1, 1].
    pub bull_score: f64,
    /// Mean score of tests targeting the bear thesis, in [-1, 1].
    pub bear_score: f64,
    pub key_disagreements: Vec<String>,
}

/// Tunables for the cross-examination engine. The verdict cutoffs and the
/// disagreement threshold are deliberately configuration, not constants.
#[derive(Debug, Clone)]
pub struct ExamConfig {
    /// Minimum score for a `survived` outcome.
    pub survive_threshold: f64,
    /// Maximum score for a `refuted` outcome.
    pub refute_threshold: f64,
    /// Fair-probability gap between theses that flags a disagreement.
    pub disagreement_threshold: f64,
    /// Concurrent judge calls per cycle.
    pub max_concurrent_tests: usize,
    /// Per-call judge timeout.
    pub judge_timeout_ms: u64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            survive_threshold: 0.25,
            refute_threshold: -0.25,
            disagreement_threshold: 0.3,
            max_concurrent_tests: 4,
            judge_timeout_ms: 20_000,
        }
    }
}
