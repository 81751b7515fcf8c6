//! Rubric and claim construction for each test kind.
//!
//! The rubric is the judge's system prompt; the claim package carries the
//! thesis material plus whatever briefing fields the test kind needs.

use common::{MarketBriefing, Side, Thesis};
use serde_json::json;

use crate::types::TestKind;

const RESPONSE_FORMAT: &str = r#"Respond with exactly these two lines first:
VERDICT: SURVIVED | WEAKENED | REFUTED
SCORE: a number between -1.0 and 1.0
Then give a short justification (3 sentences max)."#;

fn kind_charge(kind: TestKind) -> &'static str {
    match kind {
        TestKind::Evidence => {
            "Attack the evidential basis of the claim. Does the cited support actually \
             exist, and does it bear the weight the argument puts on it?"
        }
        TestKind::Causality => {
            "Attack the causal chain. Does each step actually follow from the previous \
             one, or does the argument mistake correlation or narrative for mechanism?"
        }
        TestKind::Timing => {
            "Attack the timeline. Can the claimed catalysts plausibly play out before \
             the market expires, given the expiry and catalyst timestamps provided?"
        }
        TestKind::Liquidity => {
            "Attack the tradability assumption. Given the liquidity score and bid/ask \
             spread provided, could this view actually be expressed at a sane cost?"
        }
        TestKind::TailRisk => {
            "Attack the failure conditions. Which low-probability events would break \
             this argument outright, and does the argument price them in at all?"
        }
    }
}

pub fn build_rubric(kind: TestKind, shortened: bool) -> String {
    if shortened {
        return format!(
            "You are an adversarial examiner for a prediction market analysis desk. \
             {}\n{}",
            kind_charge(kind),
            RESPONSE_FORMAT
        );
    }

    format!(
        r#"You are an adversarial examiner for a prediction market analysis desk.
You are given one side's thesis on a market. Your job is the {} test: {}

Judge only this dimension. Be severe but fair: a thesis survives when the
argument holds under your attack, is weakened when it has real but partial
flaws, and is refuted when you find a disqualifying flaw.

{}"#,
        kind.as_str(),
        kind_charge(kind),
        RESPONSE_FORMAT
    )
}

pub fn build_claim(
    kind: TestKind,
    thesis: &Thesis,
    briefing: Option<&MarketBriefing>,
) -> serde_json::Value {
    let mut claim = json!({
        "test": kind.as_str(),
        "side": thesis.side,
        "position": match thesis.side {
            Side::Yes => "market resolves YES",
            Side::No => "market resolves NO",
        },
        "fair_probability": thesis.fair_probability,
        "market_probability": thesis.market_probability,
        "argument": thesis.argument,
        "catalysts": thesis.catalysts,
        "failure_conditions": thesis.failure_conditions,
        "supporting_signals": thesis.supporting_signals,
    });

    if let Some(briefing) = briefing {
        let extra = match kind {
            TestKind::Timing => json!({
                "question": briefing.question,
                "expires_at": briefing.expires_at,
                "key_catalysts": briefing.key_catalysts,
            }),
            TestKind::Liquidity => json!({
                "question": briefing.question,
                "liquidity_score": briefing.liquidity_score,
                "bid_ask_spread": briefing.bid_ask_spread,
                "volume_24h": briefing.volume_24h,
            }),
            // Evidence, causality, and tail-risk judge the argument itself.
            _ => json!({
                "question": briefing.question,
                "resolution_criteria": briefing.resolution_criteria,
                "ambiguity_flags": briefing.ambiguity_flags,
            }),
        };
        claim["market"] = extra;
    }

    claim
}
