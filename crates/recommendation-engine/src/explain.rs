//! Explanation resolution: generator context, three-tier parsing, and the
//! deterministic fallback template.

use common::{Consensus, MarketBriefing, Thesis};
use examination_engine::DebateRecord;
use judge_client::{parse_explanation, ExplanationPayload};
use serde_json::json;

use crate::types::TradeAction;

/// A disagreement index above this warrants an uncertainty note.
const UNCERTAINTY_NOTE_MIN_DISAGREEMENT: f64 = 0.15;

/// Outcome of one generator attempt. Downstream code matches on this instead
/// of probing a loosely-typed object for half-present fields.
#[derive(Debug)]
pub enum ParsedExplanation {
    Generated(ExplanationPayload),
    Fallback { reason: String },
}

pub fn parse_generated(raw: &str) -> ParsedExplanation {
    match parse_explanation(raw) {
        Some(payload) => ParsedExplanation::Generated(payload),
        None => ParsedExplanation::Fallback {
            reason: "no usable JSON object in generator output".to_string(),
        },
    }
}

/// Structured context handed to the explanation generator.
pub fn build_context(
    briefing: &MarketBriefing,
    consensus: &Consensus,
    debate: Option<&DebateRecord>,
    action: TradeAction,
    expected_value: f64,
    win_probability: f64,
    primary: &Thesis,
    secondary: &Thesis,
) -> serde_json::Value {
    let mut context = json!({
        "market": {
            "id": briefing.market_id,
            "question": briefing.question,
            "market_probability": briefing.market_probability,
            "liquidity_score": briefing.liquidity_score,
            "volatility": briefing.volatility,
            "expires_at": briefing.expires_at,
        },
        "recommendation": {
            "action": action,
            "expected_value_per_100": expected_value,
            "win_probability": win_probability,
            "consensus_probability": consensus.consensus_probability,
            "confidence_band": consensus.confidence_band,
            "disagreement_index": consensus.disagreement_index,
        },
        "primary_thesis": {
            "side": primary.side,
            "fair_probability": primary.fair_probability,
            "argument": primary.argument,
            "catalysts": primary.catalysts,
            "failure_conditions": primary.failure_conditions,
        },
        "secondary_thesis": {
            "side": secondary.side,
            "fair_probability": secondary.fair_probability,
            "argument": secondary.argument,
        },
    });

    if let Some(debate) = debate {
        context["debate"] = json!({
            "bull_score": debate.bull_score,
            "bear_score": debate.bear_score,
            "key_disagreements": debate.key_disagreements,
        });
    }

    context
}

/// Deterministic template used whenever the generator fails or returns
/// nothing parseable. Built entirely from the primary thesis's own fields.
pub fn fallback_explanation(
    action: TradeAction,
    expected_value: f64,
    primary: &Thesis,
) -> ExplanationPayload {
    ExplanationPayload {
        summary: format!(
            "{} recommended with expected value ${:.2} per $100 notional",
            action, expected_value
        ),
        core_thesis: primary.argument.clone(),
        key_catalysts: primary.catalysts.clone(),
        failure_scenarios: primary.failure_conditions.clone(),
        uncertainty_note: None,
        risk_perspectives: None,
    }
}

/// The engine, not the generator, owns the uncertainty-note rule: notes are
/// stripped below the disagreement threshold and synthesized above it.
pub fn apply_uncertainty_rule(
    mut payload: ExplanationPayload,
    consensus: &Consensus,
) -> ExplanationPayload {
    if consensus.disagreement_index > UNCERTAINTY_NOTE_MIN_DISAGREEMENT {
        if payload.uncertainty_note.is_none() {
            payload.uncertainty_note = Some(format!(
                "Contributing agents disagree materially (index {:.2}); the consensus estimate carries extra uncertainty.",
                consensus.disagreement_index
            ));
        }
    } else {
        payload.uncertainty_note = None;
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ConfidenceBand, Side};

    fn consensus(disagreement: f64) -> Consensus {
        Consensus {
            consensus_probability: 0.6,
            disagreement_index: disagreement,
            confidence_band: ConfidenceBand::new(0.5, 0.7),
        }
    }

    fn payload(note: Option<&str>) -> ExplanationPayload {
        ExplanationPayload {
            summary: "s".into(),
            core_thesis: "c".into(),
            key_catalysts: vec![],
            failure_scenarios: vec![],
            uncertainty_note: note.map(str::to_string),
            risk_perspectives: None,
        }
    }

    #[test]
    fn note_stripped_below_threshold() {
        let out = apply_uncertainty_rule(payload(Some("worried")), &consensus(0.1));
        assert!(out.uncertainty_note.is_none());
    }

    #[test]
    fn note_synthesized_above_threshold() {
        let out = apply_uncertainty_rule(payload(None), &consensus(0.3));
        assert!(out.uncertainty_note.is_some());
    }

    #[test]
    fn generator_note_kept_above_threshold() {
        let out = apply_uncertainty_rule(payload(Some("worried")), &consensus(0.3));
        assert_eq!(out.uncertainty_note.as_deref(), Some("worried"));
    }

    #[test]
    fn threshold_is_exclusive() {
        let out = apply_uncertainty_rule(payload(Some("worried")), &consensus(0.15));
        assert!(out.uncertainty_note.is_none());
    }

    #[test]
    fn fallback_copies_primary_thesis_verbatim() {
        let primary = Thesis {
            side: Side::Yes,
            fair_probability: 0.7,
            market_probability: 0.5,
            argument: "the argument".into(),
            catalysts: vec!["cat-1".into()],
            failure_conditions: vec!["fail-1".into()],
            supporting_signals: vec![],
        };
        let out = fallback_explanation(TradeAction::LongYes, 12.5, &primary);
        assert!(out.summary.contains("LONG_YES"));
        assert!(out.summary.contains("12.50"));
        assert_eq!(out.core_thesis, "the argument");
        assert_eq!(out.key_catalysts, vec!["cat-1"]);
        assert_eq!(out.failure_scenarios, vec!["fail-1"]);
    }
}
