//! Deterministic trade synthesis: gates, expected value, zone geometry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{
    clamp_prob, AuditEntry, AuditSink, ConfidenceBand, Consensus, Error, MarketBriefing, Thesis,
    Zone, STAGE_RECOMMENDATION,
};
use examination_engine::DebateRecord;
use judge_client::{ExplanationGenerator, ExplanationPayload};
use serde_json::json;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::explain::{
    apply_uncertainty_rule, build_context, fallback_explanation, parse_generated,
    ParsedExplanation,
};
use crate::types::{
    LiquidityRisk, RecommendationMetadata, SynthConfig, TradeAction, TradeRecommendation,
};

const ENTRY_ZONE_HALF_WIDTH: f64 = 0.02;

/// Expected value in dollars per $100 notional for the given direction.
/// A zero-cost position has no defined payoff ratio and reports 0.
pub fn expected_value(
    direction: TradeAction,
    market_probability: f64,
    consensus_probability: f64,
) -> f64 {
    let (cost, p_win) = match direction {
        TradeAction::LongYes => (market_probability, consensus_probability),
        TradeAction::LongNo => (1.0 - market_probability, 1.0 - consensus_probability),
        TradeAction::NoTrade => return 0.0,
    };
    if cost <= 0.0 {
        return 0.0;
    }
    let payoff_if_win = 1.0 / cost - 1.0;
    (p_win * payoff_if_win - (1.0 - p_win)) * 100.0
}

pub fn win_probability(direction: TradeAction, consensus_probability: f64) -> f64 {
    match direction {
        TradeAction::LongNo => 1.0 - consensus_probability,
        _ => consensus_probability,
    }
}

pub fn entry_zone(direction: TradeAction, market_probability: f64) -> Zone {
    let price = match direction {
        TradeAction::LongYes => market_probability,
        TradeAction::LongNo => 1.0 - market_probability,
        TradeAction::NoTrade => return Zone::zero(),
    };
    Zone::new(price - ENTRY_ZONE_HALF_WIDTH, price + ENTRY_ZONE_HALF_WIDTH)
}

pub fn target_zone(direction: TradeAction, band: &ConfidenceBand) -> Zone {
    match direction {
        TradeAction::LongYes => Zone::new(band.lower, band.upper),
        TradeAction::LongNo => Zone::new(1.0 - band.upper, 1.0 - band.lower),
        TradeAction::NoTrade => Zone::zero(),
    }
}

pub fn liquidity_risk(liquidity_score: f64) -> LiquidityRisk {
    if liquidity_score < 5.0 {
        LiquidityRisk::High
    } else if liquidity_score < 7.0 {
        LiquidityRisk::Medium
    } else {
        LiquidityRisk::Low
    }
}

/// Gate cascade: the edge gate first, then the negative-EV override.
pub fn resolve_action(
    edge: f64,
    min_edge: f64,
    direction: TradeAction,
    expected_value: f64,
) -> TradeAction {
    if edge < min_edge || expected_value < 0.0 {
        TradeAction::NoTrade
    } else {
        direction
    }
}

pub struct Synthesizer {
    generator: Arc<dyn ExplanationGenerator>,
    config: SynthConfig,
    audit: AuditSink,
}

impl Synthesizer {
    pub fn new(
        generator: Arc<dyn ExplanationGenerator>,
        config: SynthConfig,
        audit: AuditSink,
    ) -> Self {
        Self {
            generator,
            config,
            audit,
        }
    }

    /// Synthesize a trade recommendation from the consensus estimate, the
    /// examined theses, and the market briefing. A NO_TRADE outcome is a
    /// successful cycle; only missing inputs produce an error.
    pub async fn recommend(
        &self,
        briefing: Option<&MarketBriefing>,
        bull: Option<&Thesis>,
        bear: Option<&Thesis>,
        consensus: Option<&Consensus>,
        debate: Option<&DebateRecord>,
    ) -> Result<TradeRecommendation, Error> {
        let started = Instant::now();

        // Preconditions, in order; the first missing input wins.
        let consensus = match consensus {
            Some(consensus) => consensus,
            None => {
                return Err(self.missing_input(
                    started,
                    "consensus estimate is required for recommendation synthesis",
                ))
            }
        };
        let (bull, bear) = match (bull, bear) {
            (Some(bull), Some(bear)) => (bull, bear),
            _ => {
                return Err(self.missing_input(
                    started,
                    "both theses are required for recommendation synthesis",
                ))
            }
        };
        let briefing = match briefing {
            Some(briefing) => briefing,
            None => {
                return Err(self.missing_input(
                    started,
                    "market briefing is required for recommendation synthesis",
                ))
            }
        };

        let market_p = clamp_prob(briefing.market_probability);
        let consensus_p = clamp_prob(consensus.consensus_probability);
        // External input; re-normalize rather than trusting upstream clamping.
        let band = ConfidenceBand::new(
            consensus.confidence_band.lower,
            consensus.confidence_band.upper,
        );
        let edge = (consensus_p - market_p).abs();
        let direction = if consensus_p > market_p {
            TradeAction::LongYes
        } else {
            TradeAction::LongNo
        };
        let ev = expected_value(direction, market_p, consensus_p);
        let win_prob = win_probability(direction, consensus_p);
        let risk = liquidity_risk(briefing.liquidity_score);
        let metadata = RecommendationMetadata {
            consensus_probability: consensus_p,
            market_probability: market_p,
            edge,
            confidence_band: band,
        };

        let action = resolve_action(edge, self.config.min_edge_threshold, direction, ev);
        let recommendation = match action {
            TradeAction::NoTrade if edge < self.config.min_edge_threshold => {
                let explanation = apply_uncertainty_rule(
                    ExplanationPayload {
                        summary: format!(
                            "No trade: edge {:.3} is below the minimum threshold {:.3}",
                            edge, self.config.min_edge_threshold
                        ),
                        core_thesis: format!(
                            "Consensus {:.2} and market {:.2} are too close to justify a position.",
                            consensus_p, market_p
                        ),
                        key_catalysts: vec![],
                        failure_scenarios: vec![],
                        uncertainty_note: None,
                        risk_perspectives: None,
                    },
                    consensus,
                );
                TradeRecommendation {
                    market_id: briefing.market_id.clone(),
                    action: TradeAction::NoTrade,
                    entry_zone: Zone::zero(),
                    target_zone: Zone::zero(),
                    expected_value: 0.0,
                    win_probability: win_prob,
                    liquidity_risk: risk,
                    explanation,
                    metadata,
                }
            }
            TradeAction::NoTrade => {
                // Negative expected value despite a sufficient edge. The
                // rejected direction's numbers are reported for transparency.
                let explanation = apply_uncertainty_rule(
                    ExplanationPayload {
                        summary: format!(
                            "No trade: {} rejected, expected value ${:.2} per $100 notional is negative",
                            direction, ev
                        ),
                        core_thesis: format!(
                            "The payoff at market price {:.2} does not compensate the {:.0}% loss probability.",
                            market_p,
                            (1.0 - win_prob) * 100.0
                        ),
                        key_catalysts: vec![],
                        failure_scenarios: vec![],
                        uncertainty_note: None,
                        risk_perspectives: None,
                    },
                    consensus,
                );
                TradeRecommendation {
                    market_id: briefing.market_id.clone(),
                    action: TradeAction::NoTrade,
                    entry_zone: Zone::zero(),
                    target_zone: Zone::zero(),
                    expected_value: ev,
                    win_probability: win_prob,
                    liquidity_risk: risk,
                    explanation,
                    metadata,
                }
            }
            action => {
                let (primary, secondary) = match action {
                    TradeAction::LongYes => (bull, bear),
                    _ => (bear, bull),
                };
                let context = build_context(
                    briefing, consensus, debate, action, ev, win_prob, primary, secondary,
                );
                let explanation = self
                    .resolve_explanation(&context, action, ev, primary, consensus)
                    .await;
                TradeRecommendation {
                    market_id: briefing.market_id.clone(),
                    action,
                    entry_zone: entry_zone(action, market_p),
                    target_zone: target_zone(action, &band),
                    expected_value: ev,
                    win_probability: win_prob,
                    liquidity_risk: risk,
                    explanation,
                    metadata,
                }
            }
        };

        info!(
            market_id = %recommendation.market_id,
            action = %recommendation.action,
            edge,
            expected_value = recommendation.expected_value,
            "recommendation synthesized"
        );
        self.audit.record(AuditEntry::new(
            STAGE_RECOMMENDATION,
            true,
            started.elapsed().as_millis() as u64,
            json!({
                "action": recommendation.action,
                "edge": edge,
                "expected_value": recommendation.expected_value,
            }),
        ));
        Ok(recommendation)
    }

    fn missing_input(&self, started: Instant, reason: &str) -> Error {
        warn!("recommendation synthesis aborted: {}", reason);
        self.audit.record(AuditEntry::new(
            STAGE_RECOMMENDATION,
            false,
            started.elapsed().as_millis() as u64,
            json!({ "error": reason }),
        ));
        Error::MissingInput(reason.to_string())
    }

    async fn resolve_explanation(
        &self,
        context: &serde_json::Value,
        action: TradeAction,
        ev: f64,
        primary: &Thesis,
        consensus: &Consensus,
    ) -> ExplanationPayload {
        let parsed = match timeout(
            Duration::from_millis(self.config.explanation_timeout_ms),
            self.generator.generate(context),
        )
        .await
        {
            Ok(Ok(raw)) => parse_generated(&raw),
            Ok(Err(e)) => ParsedExplanation::Fallback {
                reason: e.to_string(),
            },
            Err(_) => ParsedExplanation::Fallback {
                reason: "explanation generator timed out".to_string(),
            },
        };

        let payload = match parsed {
            ParsedExplanation::Generated(payload) => payload,
            ParsedExplanation::Fallback { reason } => {
                warn!("falling back to deterministic explanation: {}", reason);
                fallback_explanation(action, ev, primary)
            }
        };
        apply_uncertainty_rule(payload, consensus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use common::{Side, VolatilityRegime};
    use judge_client::JudgeError;

    struct ScriptedGenerator(String);

    #[async_trait]
    impl ExplanationGenerator for ScriptedGenerator {
        async fn generate(&self, _context: &serde_json::Value) -> Result<String, JudgeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ExplanationGenerator for FailingGenerator {
        async fn generate(&self, _context: &serde_json::Value) -> Result<String, JudgeError> {
            Err(JudgeError::Api("generator down".into()))
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl ExplanationGenerator for SlowGenerator {
        async fn generate(&self, _context: &serde_json::Value) -> Result<String, JudgeError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("too late".into())
        }
    }

    const GOOD_JSON: &str = r#"{"summary": "Generated summary", "coreThesis": "Generated thesis", "keyCatalysts": ["k"], "failureScenarios": ["f"]}"#;

    fn briefing(market_probability: f64, liquidity_score: f64) -> MarketBriefing {
        MarketBriefing {
            market_id: "MKT-1".into(),
            question: "Will X happen?".into(),
            resolution_criteria: "Official announcement".into(),
            expires_at: Utc::now(),
            market_probability,
            liquidity_score,
            bid_ask_spread: 0.01,
            volatility: VolatilityRegime::Normal,
            volume_24h: 10_000.0,
            ambiguity_flags: vec![],
            key_catalysts: vec![],
        }
    }

    fn theses() -> (Thesis, Thesis) {
        let bull = Thesis {
            side: Side::Yes,
            fair_probability: 0.7,
            market_probability: 0.48,
            argument: "bull case".into(),
            catalysts: vec!["launch".into()],
            failure_conditions: vec!["delay".into()],
            supporting_signals: vec![],
        };
        let bear = Thesis {
            side: Side::No,
            fair_probability: 0.35,
            market_probability: 0.48,
            argument: "bear case".into(),
            catalysts: vec!["recall".into()],
            failure_conditions: vec!["hype".into()],
            supporting_signals: vec![],
        };
        (bull, bear)
    }

    fn consensus(p: f64, disagreement: f64) -> Consensus {
        Consensus {
            consensus_probability: p,
            disagreement_index: disagreement,
            confidence_band: ConfidenceBand::new(p - 0.08, p + 0.08),
        }
    }

    fn synthesizer(
        generator: Arc<dyn ExplanationGenerator>,
        config: SynthConfig,
    ) -> (
        Synthesizer,
        tokio::sync::mpsc::UnboundedReceiver<AuditEntry>,
    ) {
        let (audit, rx) = AuditSink::channel();
        (Synthesizer::new(generator, config, audit), rx)
    }

    #[tokio::test]
    async fn missing_consensus_is_checked_first() {
        let (synth, mut rx) =
            synthesizer(Arc::new(FailingGenerator), SynthConfig::default());
        let result = synth.recommend(None, None, None, None, None).await;
        match result {
            Err(Error::MissingInput(reason)) => assert!(reason.contains("consensus")),
            other => panic!("expected MissingInput, got {:?}", other.map(|_| ())),
        }
        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.stage, STAGE_RECOMMENDATION);
        assert!(!entry.success);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_thesis_is_checked_second() {
        let (synth, _rx) = synthesizer(Arc::new(FailingGenerator), SynthConfig::default());
        let (bull, _) = theses();
        let c = consensus(0.6, 0.05);
        let result = synth.recommend(None, Some(&bull), None, Some(&c), None).await;
        match result {
            Err(Error::MissingInput(reason)) => assert!(reason.contains("theses")),
            other => panic!("expected MissingInput, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn missing_briefing_is_checked_last() {
        let (synth, _rx) = synthesizer(Arc::new(FailingGenerator), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.6, 0.05);
        let result = synth
            .recommend(None, Some(&bull), Some(&bear), Some(&c), None)
            .await;
        match result {
            Err(Error::MissingInput(reason)) => assert!(reason.contains("market briefing")),
            other => panic!("expected MissingInput, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn thin_edge_yields_no_trade() {
        let (synth, mut rx) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.50, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.49, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();

        assert_eq!(rec.action, TradeAction::NoTrade);
        assert_eq!(rec.entry_zone, Zone::zero());
        assert_eq!(rec.target_zone, Zone::zero());
        assert_eq!(rec.expected_value, 0.0);
        assert!(rec.explanation.summary.contains("below the minimum threshold"));

        // The edge gate is a successful cycle outcome.
        let entry = rx.try_recv().unwrap();
        assert!(entry.success);
    }

    #[tokio::test]
    async fn positive_edge_long_yes() {
        let (synth, _rx) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.68, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.48, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();

        assert_eq!(rec.action, TradeAction::LongYes);
        assert!(rec.expected_value > 0.0);
        assert!((rec.win_probability - 0.68).abs() < 1e-12);
        assert!((rec.entry_zone.low - 0.46).abs() < 1e-12);
        assert!((rec.entry_zone.high - 0.50).abs() < 1e-12);
        assert!((rec.target_zone.low - 0.60).abs() < 1e-9);
        assert!((rec.target_zone.high - 0.76).abs() < 1e-9);
        assert_eq!(rec.liquidity_risk, LiquidityRisk::Low);
        assert!((rec.metadata.edge - 0.20).abs() < 1e-12);
    }

    #[tokio::test]
    async fn positive_edge_long_no_mirrors_yes() {
        let (synth, _rx) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.32, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.52, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();

        assert_eq!(rec.action, TradeAction::LongNo);
        assert!(rec.expected_value > 0.0);
        assert!((rec.win_probability - 0.68).abs() < 1e-12);
        // NO entry price is 1 - market.
        assert!((rec.entry_zone.low - 0.46).abs() < 1e-12);
        assert!((rec.entry_zone.high - 0.50).abs() < 1e-12);
        // Target zone is the inverted confidence band.
        assert!((rec.target_zone.low - 0.60).abs() < 1e-9);
        assert!((rec.target_zone.high - 0.76).abs() < 1e-9);
    }

    #[test]
    fn mirrored_directions_have_equal_expected_value() {
        let yes_ev = expected_value(TradeAction::LongYes, 0.48, 0.68);
        let no_ev = expected_value(TradeAction::LongNo, 0.52, 0.32);
        assert!(yes_ev > 0.0);
        assert!((yes_ev - no_ev).abs() < 1e-9);
    }

    #[test]
    fn zero_cost_position_has_zero_expected_value() {
        assert_eq!(expected_value(TradeAction::LongYes, 0.0, 0.4), 0.0);
        assert_eq!(expected_value(TradeAction::LongNo, 1.0, 0.4), 0.0);
    }

    #[test]
    fn negative_expected_value_forces_no_trade() {
        // A direction whose payoff cannot carry its loss probability.
        let ev = expected_value(TradeAction::LongYes, 0.6, 0.4);
        assert!(ev < 0.0);
        assert_eq!(resolve_action(0.2, 0.05, TradeAction::LongYes, ev), TradeAction::NoTrade);
        // The same edge with positive EV trades.
        assert_eq!(resolve_action(0.2, 0.05, TradeAction::LongYes, 10.0), TradeAction::LongYes);
    }

    #[test]
    fn entry_zone_clamps_at_bounds() {
        let zone = entry_zone(TradeAction::LongYes, 0.01);
        assert_eq!(zone.low, 0.0);
        assert!((zone.high - 0.03).abs() < 1e-12);
        assert!(zone.low <= zone.high);

        let zone = entry_zone(TradeAction::LongNo, 0.01);
        assert!((zone.low - 0.97).abs() < 1e-12);
        assert_eq!(zone.high, 1.0);
    }

    #[test]
    fn liquidity_risk_bands() {
        assert_eq!(liquidity_risk(4.9), LiquidityRisk::High);
        assert_eq!(liquidity_risk(5.0), LiquidityRisk::Medium);
        assert_eq!(liquidity_risk(6.9), LiquidityRisk::Medium);
        assert_eq!(liquidity_risk(7.0), LiquidityRisk::Low);
    }

    #[tokio::test]
    async fn generated_explanation_is_used_when_valid() {
        let (synth, _rx) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.68, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.48, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();
        assert_eq!(rec.explanation.summary, "Generated summary");
    }

    #[tokio::test]
    async fn generator_failure_falls_back_to_primary_thesis() {
        let (synth, _rx) = synthesizer(Arc::new(FailingGenerator), SynthConfig::default());
        let (bull, bear) = theses();
        let c = consensus(0.68, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.48, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();

        assert_eq!(rec.action, TradeAction::LongYes);
        assert_eq!(rec.explanation.core_thesis, "bull case");
        assert_eq!(rec.explanation.key_catalysts, vec!["launch"]);
        assert_eq!(rec.explanation.failure_scenarios, vec!["delay"]);
    }

    #[tokio::test]
    async fn generator_garbage_falls_back() {
        let (synth, _rx) = synthesizer(
            Arc::new(ScriptedGenerator("not json at all".into())),
            SynthConfig::default(),
        );
        let (bull, bear) = theses();
        let c = consensus(0.32, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.52, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();
        // LONG_NO uses the bear thesis as primary.
        assert_eq!(rec.explanation.core_thesis, "bear case");
    }

    #[tokio::test]
    async fn slow_generator_times_out_to_fallback() {
        let config = SynthConfig {
            explanation_timeout_ms: 10,
            ..SynthConfig::default()
        };
        let (synth, _rx) = synthesizer(Arc::new(SlowGenerator), config);
        let (bull, bear) = theses();
        let c = consensus(0.68, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.48, 8.0)), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();
        assert_eq!(rec.explanation.core_thesis, "bull case");
    }

    #[tokio::test]
    async fn uncertainty_note_tracks_disagreement_index() {
        let (synth, _rx) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (bull, bear) = theses();

        let calm = consensus(0.68, 0.05);
        let rec = synth
            .recommend(Some(&briefing(0.48, 8.0)), Some(&bull), Some(&bear), Some(&calm), None)
            .await
            .unwrap();
        assert!(rec.explanation.uncertainty_note.is_none());

        let contested = consensus(0.68, 0.4);
        let rec = synth
            .recommend(
                Some(&briefing(0.48, 8.0)),
                Some(&bull),
                Some(&bear),
                Some(&contested),
                None,
            )
            .await
            .unwrap();
        assert!(rec.explanation.uncertainty_note.is_some());
    }

    #[tokio::test]
    async fn identical_inputs_produce_identical_numbers() {
        let (bull, bear) = theses();
        let c = consensus(0.68, 0.05);
        let b = briefing(0.48, 6.0);

        let (first_synth, _rx1) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());
        let (second_synth, _rx2) =
            synthesizer(Arc::new(ScriptedGenerator(GOOD_JSON.into())), SynthConfig::default());

        let first = first_synth
            .recommend(Some(&b), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();
        let second = second_synth
            .recommend(Some(&b), Some(&bull), Some(&bear), Some(&c), None)
            .await
            .unwrap();

        assert_eq!(first.action, second.action);
        assert_eq!(first.expected_value, second.expected_value);
        assert_eq!(first.entry_zone, second.entry_zone);
        assert_eq!(first.target_zone, second.target_zone);
        assert_eq!(first.win_probability, second.win_probability);
        assert_eq!(first.liquidity_risk, second.liquidity_risk);
    }
}
