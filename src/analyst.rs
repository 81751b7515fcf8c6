use common::{Consensus, MarketBriefing, Thesis};
use examination_engine::CrossExaminer;
use recommendation_engine::{Synthesizer, TradeRecommendation};
use serde::Deserialize;
use tracing::{info, warn};

/// One analysis cycle's worth of upstream inputs. Thesis generation and the
/// consensus calculator live outside this binary; either may have failed,
/// which is why every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisInput {
    pub briefing: Option<MarketBriefing>,
    pub bull: Option<Thesis>,
    pub bear: Option<Thesis>,
    pub consensus: Option<Consensus>,
}

pub struct Analyst {
    examiner: CrossExaminer,
    synthesizer: Synthesizer,
}

impl Analyst {
    pub fn new(examiner: CrossExaminer, synthesizer: Synthesizer) -> Self {
        Self {
            examiner,
            synthesizer,
        }
    }

    /// Run cross-examination and synthesis for one market. Missing-input
    /// conditions surface as "no recommendation this cycle"; the caller
    /// decides whether to skip, retry later, or alert.
    pub async fn run_cycle(&self, input: &AnalysisInput) -> Option<TradeRecommendation> {
        let debate = match self
            .examiner
            .examine(
                input.briefing.as_ref(),
                input.bull.as_ref(),
                input.bear.as_ref(),
            )
            .await
        {
            Ok(record) => {
                info!(
                    bull_score = record.bull_score,
                    bear_score = record.bear_score,
                    disagreements = record.key_disagreements.len(),
                    "debate record produced"
                );
                Some(record)
            }
            Err(e) => {
                warn!("cross-examination produced no debate record: {}", e);
                None
            }
        };

        match self
            .synthesizer
            .recommend(
                input.briefing.as_ref(),
                input.bull.as_ref(),
                input.bear.as_ref(),
                input.consensus.as_ref(),
                debate.as_ref(),
            )
            .await
        {
            Ok(recommendation) => Some(recommendation),
            Err(e) => {
                warn!("no recommendation this cycle: {}", e);
                None
            }
        }
    }
}
