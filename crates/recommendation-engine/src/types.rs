use common::{ConfidenceBand, Zone};
use judge_client::ExplanationPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    LongYes,
    LongNo,
    NoTrade,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::LongYes => write!(f, "LONG_YES"),
            TradeAction::LongNo => write!(f, "LONG_NO"),
            TradeAction::NoTrade => write!(f, "NO_TRADE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityRisk {
    Low,
    Medium,
    High,
}

/// Derived inputs echoed back for transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub consensus_probability: f64,
    pub market_probability: f64,
    pub edge: f64,
    pub confidence_band: ConfidenceBand,
}

/// Final output of one analysis cycle. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecommendation {
    pub market_id: String,
    pub action: TradeAction,
    pub entry_zone: Zone,
    pub target_zone: Zone,
    /// Signed dollars per $100 notional.
    pub expected_value: f64,
    pub win_probability: f64,
    pub liquidity_risk: LiquidityRisk,
    pub explanation: ExplanationPayload,
    pub metadata: RecommendationMetadata,
}

#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Minimum |consensus - market| edge required to trade.
    pub min_edge_threshold: f64,
    /// Timeout for the explanation generator call.
    pub explanation_timeout_ms: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            min_edge_threshold: 0.05,
            explanation_timeout_ms: 15_000,
        }
    }
}
