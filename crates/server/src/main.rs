use anyhow::Context;
use std::sync::Arc;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yenslip_ocr::{Extractor, ReceiptPipeline};
use yenslip_server::{start_server, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(
            "yenslip-server".into(),
            std::io::stdout,
        ))
        .init();

    let config = ServerConfig::load().context("loading configuration")?;
    tracing::info!(
        bind = %config.bind,
        data_dir = %config.data_dir.display(),
        backend = ?config.ocr_backend,
        "configuration loaded"
    );

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let pool = yenslip_storage::create_db(&config.db_path())
        .await
        .context("opening receipt database")?;

    let extractor = Extractor::new(&config.vocabulary()?)?;
    let recognizer = config.recognizer().context("configuring OCR backend")?;
    let pipeline = ReceiptPipeline::new(recognizer, config.uploads_dir())
        .with_extractor(Arc::new(extractor))
        .with_ocr_log(config.ocr_log_path());

    let state = AppState::new(pool, pipeline, config.max_upload_bytes);
    start_server(&config.bind, state).await?;

    Ok(())
}
