//! Single-test execution: rubric dispatch, verdict parsing, degradation.

use std::time::Duration;

use common::{MarketBriefing, Thesis};
use judge_client::{Judge, JudgeError};
use tokio::time::timeout;
use tracing::warn;

use crate::rubric::{build_claim, build_rubric};
use crate::types::{ExamConfig, ExaminationTest, TestKind, TestOutcome};

const MAX_RATIONALE_CHARS: usize = 600;

/// Map a free-text verdict to a score in [-1, 1] and an outcome.
///
/// Tries the structured `SCORE:` marker first, then a `VERDICT:` line, then a
/// lexical tally of affirming and flaw language. The outcome is derived from
/// the score, so score/outcome agreement holds structurally and more affirming
/// verdicts never produce a lower score.
pub fn parse_verdict(text: &str, config: &ExamConfig) -> (f64, TestOutcome) {
    let score = score_from_marker(text)
        .or_else(|| score_from_verdict_line(text))
        .unwrap_or_else(|| lexical_score(text))
        .clamp(-1.0, 1.0);
    (score, outcome_for(score, config))
}

fn score_from_marker(text: &str) -> Option<f64> {
    let upper = text.to_ascii_uppercase();
    let idx = upper.find("SCORE:")?;
    let rest = &text[idx + "SCORE:".len()..];
    let token = rest.split_whitespace().next()?;
    let token = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    token.parse::<f64>().ok()
}

fn score_from_verdict_line(text: &str) -> Option<f64> {
    let upper = text.to_ascii_uppercase();
    let idx = upper.find("VERDICT:")?;
    let rest = &upper[idx + "VERDICT:".len()..];
    let word = rest.split_whitespace().next()?;
    match word {
        "SURVIVED" => Some(0.75),
        "WEAKENED" => Some(0.0),
        "REFUTED" => Some(-0.75),
        _ => None,
    }
}

const AFFIRM_TERMS: [&str; 8] = [
    "survives",
    "holds up",
    "robust",
    "compelling",
    "well-supported",
    "convincing",
    "sound",
    "credible",
];

const FLAW_TERMS: [&str; 8] = [
    "partially",
    "incomplete",
    "overstated",
    "unclear",
    "speculative",
    "questionable",
    "thin",
    "shaky",
];

const DISQUALIFY_TERMS: [&str; 6] = [
    "refuted",
    "contradicted",
    "disqualifying",
    "fatal flaw",
    "demonstrably false",
    "no supporting evidence",
];

fn lexical_score(text: &str) -> f64 {
    let lower = text.to_ascii_lowercase();
    let mut score = 0.0;
    for term in AFFIRM_TERMS {
        if lower.contains(term) {
            score += 0.3;
        }
    }
    for term in FLAW_TERMS {
        if lower.contains(term) {
            score -= 0.2;
        }
    }
    for term in DISQUALIFY_TERMS {
        if lower.contains(term) {
            score -= 0.6;
        }
    }
    score
}

fn outcome_for(score: f64, config: &ExamConfig) -> TestOutcome {
    // Cutoffs are pinned to the correct sign so a misconfigured threshold
    // cannot pair `survived` with a negative score or `refuted` with a
    // positive one.
    let survive_at = config.survive_threshold.max(0.0);
    let refute_at = config.refute_threshold.min(0.0);
    if score >= survive_at {
        TestOutcome::Survived
    } else if score <= refute_at {
        TestOutcome::Refuted
    } else {
        TestOutcome::Weakened
    }
}

fn truncate_rationale(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_RATIONALE_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_RATIONALE_CHARS).collect()
}

async fn invoke(
    judge: &dyn Judge,
    rubric: &str,
    claim: &serde_json::Value,
    timeout_ms: u64,
) -> Result<String, JudgeError> {
    match timeout(Duration::from_millis(timeout_ms), judge.verdict(rubric, claim)).await {
        Ok(result) => result,
        Err(_) => Err(JudgeError::Timeout),
    }
}

/// Run one adversarial test of one thesis. Never fails the cycle: judge
/// errors degrade to a weakened zero-score test after a single retry with a
/// shortened rubric, and timing/liquidity tests without a briefing degrade
/// without calling the judge at all.
pub async fn run_test(
    judge: &dyn Judge,
    kind: TestKind,
    thesis: &Thesis,
    briefing: Option<&MarketBriefing>,
    config: &ExamConfig,
) -> ExaminationTest {
    let target = thesis.side;

    if kind.needs_market_context() && briefing.is_none() {
        return ExaminationTest {
            kind,
            target,
            score: 0.0,
            outcome: TestOutcome::Weakened,
            rationale: format!(
                "{} test degraded: no market briefing available for contextual judgment",
                kind
            ),
        };
    }

    let claim = build_claim(kind, thesis, briefing);
    let text = match invoke(judge, &build_rubric(kind, false), &claim, config.judge_timeout_ms).await
    {
        Ok(text) => text,
        Err(first) => {
            warn!(kind = %kind, side = %target, error = %first, "judge call failed, retrying with shortened rubric");
            match invoke(judge, &build_rubric(kind, true), &claim, config.judge_timeout_ms).await {
                Ok(text) => text,
                Err(second) => {
                    warn!(kind = %kind, side = %target, error = %second, "judge retry failed, degrading test");
                    return ExaminationTest {
                        kind,
                        target,
                        score: 0.0,
                        outcome: TestOutcome::Weakened,
                        rationale: format!("judge unavailable after retry: {}", second),
                    };
                }
            }
        }
    };

    let (score, outcome) = parse_verdict(&text, config);
    ExaminationTest {
        kind,
        target,
        score,
        outcome,
        rationale: truncate_rationale(&text),
    }
}
