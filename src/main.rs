mod analyst;
mod config;
mod journal;

use std::sync::Arc;

use analyst::{AnalysisInput, Analyst};
use anyhow::Result;
use common::{AuditEntry, AuditSink};
use config::AppConfig;
use examination_engine::CrossExaminer;
use journal::{now_iso, resolve_audit_dir, AuditJournal};
use judge_client::{AnthropicClient, ExplanationGenerator, Judge};
use recommendation_engine::Synthesizer;
use serde_json::json;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load config
    let config = AppConfig::load("config.toml")?;
    info!("Loaded configuration: {:?}", config);

    if !config.llm.provider.eq_ignore_ascii_case("anthropic") {
        warn!(
            "Configured provider '{}' but this workflow currently supports Anthropic only",
            config.llm.provider
        );
    }

    // Upstream collaborators hand us one cycle's inputs as a JSON document.
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cycle.json".to_string());
    let raw = std::fs::read_to_string(&input_path)?;
    let input: AnalysisInput = serde_json::from_str(&raw)?;

    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY must be set");
    let client = Arc::new(AnthropicClient::new(
        api_key,
        config.llm.model.clone(),
        config.llm.timeout_ms,
        config.llm.max_retries,
    ));
    let judge: Arc<dyn Judge> = client.clone();
    let generator: Arc<dyn ExplanationGenerator> = client;

    let (audit, rx) = AuditSink::channel();
    let audit_journal = AuditJournal::open(resolve_audit_dir(&config.journal.dir))?;
    info!("Audit journal path: {}", audit_journal.dir().display());
    let writer = journal::spawn_writer(audit_journal, rx);

    audit.record(AuditEntry::new(
        "cycle_start",
        true,
        1,
        json!({
            "ts": now_iso(),
            "input": input_path,
            "model": config.llm.model,
        }),
    ));

    let analyst = Analyst::new(
        CrossExaminer::new(
            judge,
            config.examination.to_engine_config(),
            audit.clone(),
        ),
        Synthesizer::new(
            generator,
            config.recommendation.to_engine_config(),
            audit.clone(),
        ),
    );

    match analyst.run_cycle(&input).await {
        Some(recommendation) => {
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }
        None => {
            info!("no recommendation produced for this cycle");
        }
    }

    // Drop every sink clone so the journal writer can drain and exit.
    drop(analyst);
    drop(audit);
    writer.await?;

    Ok(())
}
