//! Core data model shared by the examination and recommendation engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market side a thesis argues for. Bull theses argue YES, bear theses NO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Calm,
    Normal,
    Elevated,
    Extreme,
}

/// A scheduled event that could move the market before resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalyst {
    pub event: String,
    #[serde(default)]
    pub expected_at: Option<DateTime<Utc>>,
}

/// Clamp a probability-like quantity into [0, 1].
pub fn clamp_prob(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// A price range in probability space. Always ordered and within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub low: f64,
    pub high: f64,
}

impl Zone {
    pub fn new(a: f64, b: f64) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: clamp_prob(low),
            high: clamp_prob(high),
        }
    }

    pub fn zero() -> Self {
        Self { low: 0.0, high: 0.0 }
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Uncertainty bounds around the consensus probability estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceBand {
    pub fn new(a: f64, b: f64) -> Self {
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        Self {
            lower: clamp_prob(lower),
            upper: clamp_prob(upper),
        }
    }
}

/// Read-only market snapshot produced upstream. Immutable for the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketBriefing {
    pub market_id: String,
    pub question: String,
    pub resolution_criteria: String,
    pub expires_at: DateTime<Utc>,
    /// Market-implied probability of YES, in [0, 1].
    pub market_probability: f64,
    /// Liquidity score on a 0-10 scale.
    pub liquidity_score: f64,
    pub bid_ask_spread: f64,
    pub volatility: VolatilityRegime,
    pub volume_24h: f64,
    #[serde(default)]
    pub ambiguity_flags: Vec<String>,
    #[serde(default)]
    pub key_catalysts: Vec<Catalyst>,
}

/// One side's analytical position, produced by an upstream generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub side: Side,
    /// The thesis's own fair-value estimate of P(YES resolves), in [0, 1].
    pub fair_probability: f64,
    /// Market-implied probability at the time the thesis was formed.
    pub market_probability: f64,
    pub argument: String,
    #[serde(default)]
    pub catalysts: Vec<String>,
    #[serde(default)]
    pub failure_conditions: Vec<String>,
    #[serde(default)]
    pub supporting_signals: Vec<String>,
}

impl Thesis {
    /// Absolute edge the thesis claims over the market. Derived, never stored.
    pub fn edge(&self) -> f64 {
        (self.fair_probability - self.market_probability).abs()
    }
}

/// Aggregated fair-value estimate from upstream agents. Consumed, never produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    pub consensus_probability: f64,
    /// 0-1, higher means more disagreement among contributing agents.
    pub disagreement_index: f64,
    pub confidence_band: ConfidenceBand,
}
