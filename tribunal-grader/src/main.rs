//! tribunal-grader service entry point

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tribunal_common::config::Config;
use tribunal_common::StreamStatus;

use tribunal_grader::pipeline::GradingDriver;
use tribunal_grader::providers::{GeminiClient, LanguageModel, SpeechToText, Unconfigured};
use tribunal_grader::storage::ArtifactStore;
use tribunal_grader::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tribunal-grader");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::load()?);
    info!("Listening address: {}", config.bind);
    info!("Upload dir: {}", config.upload_dir.display());

    let storage = ArtifactStore::new(config.upload_dir.clone());
    storage.ensure_root().await?;

    let db_path = PathBuf::from("tribunal.db");
    let db_pool = db::init_database_pool(&db_path).await?;
    db::problems::seed_builtin_problems(&db_pool).await?;

    // Submissions left in `processing` by a previous process will never
    // make progress; close their traces before serving
    let stale = db::submissions::fail_stale_processing(&db_pool).await?;
    for id in &stale {
        if let Err(e) = db::events::append_event(
            &db_pool,
            *id,
            StreamStatus::Failed,
            "Grading failed: interrupted by service restart",
            None,
            None,
        )
        .await
        {
            warn!(submission_id = %id, error = %e, "Could not close stale trace");
        }
    }
    if !stale.is_empty() {
        info!(count = stale.len(), "Failed stale processing submissions from a previous run");
    }

    let llm: Arc<dyn LanguageModel>;
    let stt: Arc<dyn SpeechToText>;
    match &config.api_key {
        Some(key) => {
            let client = Arc::new(GeminiClient::new(key.clone(), config.model.clone())?);
            llm = client.clone();
            stt = client;
        }
        None => {
            warn!("Running without a provider API key; grading runs will fail fast");
            llm = Arc::new(Unconfigured);
            stt = Arc::new(Unconfigured);
        }
    }

    let driver = Arc::new(GradingDriver::new(
        db_pool.clone(),
        config.clone(),
        llm,
        stt,
        storage.clone(),
    ));

    let state = AppState::new(db_pool, config.clone(), storage, driver);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
