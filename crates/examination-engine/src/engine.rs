//! Cross-examination orchestration: dispatch, aggregation, disagreement
//! detection, audit.

use std::sync::Arc;
use std::time::Instant;

use common::{
    AuditEntry, AuditSink, Error, MarketBriefing, Side, Thesis, STAGE_CROSS_EXAMINATION,
};
use judge_client::Judge;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::runner::run_test;
use crate::types::{DebateRecord, ExamConfig, ExaminationTest, TestKind};

pub struct CrossExaminer {
    judge: Arc<dyn Judge>,
    config: ExamConfig,
    audit: AuditSink,
}

impl CrossExaminer {
    pub fn new(judge: Arc<dyn Judge>, config: ExamConfig, audit: AuditSink) -> Self {
        Self {
            judge,
            config,
            audit,
        }
    }

    /// Cross-examine a bull and a bear thesis: 5 test kinds against each
    /// side, dispatched concurrently, aggregated once all ten have settled.
    ///
    /// Both theses are required; a missing one yields `InsufficientData`
    /// without any judge call. A missing briefing degrades the timing and
    /// liquidity tests instead of aborting.
    pub async fn examine(
        &self,
        briefing: Option<&MarketBriefing>,
        bull: Option<&Thesis>,
        bear: Option<&Thesis>,
    ) -> Result<DebateRecord, Error> {
        let started = Instant::now();

        let (bull, bear) = match (bull, bear) {
            (Some(bull), Some(bear)) => (bull, bear),
            _ => {
                let reason = "both theses are required for cross-examination";
                self.audit.record(AuditEntry::new(
                    STAGE_CROSS_EXAMINATION,
                    false,
                    started.elapsed().as_millis() as u64,
                    json!({ "error": reason }),
                ));
                return Err(Error::InsufficientData(reason.to_string()));
            }
        };

        let tests = self.dispatch_tests(briefing, bull, bear).await;

        let bull_score = mean_score(&tests, Side::Yes);
        let bear_score = mean_score(&tests, Side::No);
        let key_disagreements = detect_disagreements(bull, bear, self.config.disagreement_threshold);

        info!(
            bull_score,
            bear_score,
            disagreements = key_disagreements.len(),
            "cross-examination complete"
        );
        self.audit.record(AuditEntry::new(
            STAGE_CROSS_EXAMINATION,
            true,
            started.elapsed().as_millis() as u64,
            json!({
                "tests": tests.len(),
                "bull_score": bull_score,
                "bear_score": bear_score,
                "disagreements": key_disagreements.len(),
            }),
        ));

        Ok(DebateRecord {
            tests,
            bull_score,
            bear_score,
            key_disagreements,
        })
    }

    /// Run the 10 executions under a bounded permit pool and wait for all of
    /// them. Aggregation is defined over the full set, so this is a barrier:
    /// every execution either completes or reaches its degraded fallback.
    async fn dispatch_tests(
        &self,
        briefing: Option<&MarketBriefing>,
        bull: &Thesis,
        bear: &Thesis,
    ) -> Vec<ExaminationTest> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tests.max(1)));
        let mut set = JoinSet::new();

        for kind in TestKind::ALL {
            for thesis in [bull, bear] {
                let judge = Arc::clone(&self.judge);
                let semaphore = Arc::clone(&semaphore);
                let thesis = thesis.clone();
                let briefing = briefing.cloned();
                let config = self.config.clone();
                set.spawn(async move {
                    // Bounds in-flight judge calls; released when the test settles.
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("examination semaphore never closed");
                    run_test(judge.as_ref(), kind, &thesis, briefing.as_ref(), &config).await
                });
            }
        }

        let mut tests = Vec::with_capacity(TestKind::ALL.len() * 2);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(test) => tests.push(test),
                Err(e) => warn!(error = %e, "examination task aborted"),
            }
        }

        // Completion order is nondeterministic; fix the record order.
        tests.sort_by_key(|t| (t.kind, t.target == Side::No));
        tests
    }
}

fn mean_score(tests: &[ExaminationTest], target: Side) -> f64 {
    let scores: Vec<f64> = tests
        .iter()
        .filter(|t| t.target == target)
        .map(|t| t.score)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(-1.0, 1.0)
}

fn detect_disagreements(bull: &Thesis, bear: &Thesis, threshold: f64) -> Vec<String> {
    let mut disagreements = Vec::new();

    let gap = (bull.fair_probability - bear.fair_probability).abs();
    if gap > threshold {
        disagreements.push(format!(
            "probability disagreement: bull fair estimate {:.2} vs bear fair estimate {:.2} (gap {:.2})",
            bull.fair_probability, bear.fair_probability, gap
        ));
    }

    for catalyst in &bull.catalysts {
        if bear
            .catalysts
            .iter()
            .any(|c| c.eq_ignore_ascii_case(catalyst))
        {
            disagreements.push(format!(
                "catalyst conflict: \"{}\" is cited by both sides",
                catalyst
            ));
        }
    }

    disagreements
}
