use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skin_journal::config::AppConfig;
use skin_journal::corpus::ReferenceCorpus;
use skin_journal::db;
use skin_journal::errors::error_logging;
use skin_journal::label_reader::{GeminiLabelReader, LabelReader};
use skin_journal::observability;
use skin_journal::ocr::TesseractRecognizer;
use skin_journal::pipeline::LabelPipeline;
use skin_journal::server::{self, ServerState};
use skin_journal::skin_analysis::{AiLabToolsClient, SkinAnalyzer};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(30);

/// Log a startup failure against the setting behind it and pass it on.
fn startup_failure<E: std::fmt::Display>(
    setting: &'static str,
    stage: &'static str,
) -> impl Fn(E) -> E {
    move |error| {
        error_logging::log_config_error(&error, setting, stage);
        error
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    observability::init_logging(&config.observability)?;
    config
        .validate()
        .map_err(startup_failure("environment", "validate_config"))
        .context("Configuration validation failed")?;
    info!(config = %config.summary(), "Configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to the database")?;
    db::init_database_schema(&pool).await?;
    let shared_pool = Arc::new(pool.clone());

    let guard = observability::init_observability_with_health_checks(
        &config.observability,
        Some(Arc::clone(&shared_pool)),
        &config.ocr.languages,
    )
    .await?;
    let _health_metrics_handle = observability::start_health_metrics_recorder(
        Some(Arc::clone(&shared_pool)),
        config.ocr.languages.clone(),
        HEALTH_METRICS_INTERVAL,
    );

    let corpus = ReferenceCorpus::load_dir(&config.pipeline.corpus_dir)
        .map_err(startup_failure("CORPUS_DIR", "load_corpus"))?;
    let recognizer = TesseractRecognizer::new(&config.ocr)
        .map_err(startup_failure("OCR_LANGUAGES", "init_tesseract"))?;
    let pipeline = LabelPipeline::from_corpus(
        Arc::new(recognizer),
        &corpus,
        &config.pipeline.bad_lists,
        &config.pipeline.word_lists(),
        config.pipeline.empty_slots,
    )
    .map_err(startup_failure("BAD_INGREDIENT_LISTS", "build_pipeline"))?;
    info!(
        dictionary_words = pipeline.corrector().word_count(),
        bad_phrases = pipeline.matcher().phrase_count(),
        "Label pipeline ready"
    );

    let skin_analyzer: Option<Arc<dyn SkinAnalyzer>> = if config.skin_analysis.enabled {
        let client = AiLabToolsClient::new(&config.skin_analysis)
            .map_err(startup_failure("AILABTOOLS_API_KEY", "init_skin_analysis"))?;
        Some(Arc::new(client))
    } else {
        warn!("Skin analysis disabled; POST /skincare/entries/ai-analysis will fail");
        None
    };
    let label_reader: Option<Arc<dyn LabelReader>> =
        match GeminiLabelReader::from_config(&config.label_reader)
            .map_err(startup_failure("GEMINI_API_KEY", "init_label_reader"))?
        {
            Some(reader) => Some(Arc::new(reader)),
            None => {
                info!("LLM label reader not configured; compatibility uses OCR only");
                None
            }
        };

    let state = Arc::new(ServerState {
        pool,
        pipeline,
        skin_analyzer,
        label_reader,
        uploads_dir: config.server.uploads_dir.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
        cors_origin: config.server.cors_origin.clone(),
        fixed_today: None,
    });

    let ip = config
        .server
        .bind_address
        .parse()
        .context("BIND_ADDRESS must be an IP address")?;
    let result = server::serve(state, SocketAddr::new(ip, config.server.port)).await;

    guard.shutdown();
    result
}
