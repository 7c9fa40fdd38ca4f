//! scribe server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and the
//! environment, opens the SQLite store, selects the blob backend and serves
//! the report API over HTTP. Expired items and operations are purged in the
//! background.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use scribe_api::{AppState, BlobBackend, Production, ServerConfig};
use scribe_blob::{Blobs, FsBlobStore, S3BlobStore};
use scribe_engine::OpenAiGenerator;
use scribe_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Scribe report server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Seconds between sweeps for expired rows.
  #[arg(long, default_value_t = 3600)]
  sweep_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store = SqliteStore::open(&server_cfg.store_path, server_cfg.tables())
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let blob = match server_cfg.blob_backend {
    BlobBackend::Fs => {
      tokio::fs::create_dir_all(&server_cfg.blob_dir)
        .await
        .with_context(|| format!("failed to create blob directory {:?}", server_cfg.blob_dir))?;
      Blobs::Fs(FsBlobStore::new(&server_cfg.blob_dir, server_cfg.base_url.clone()))
    }
    BlobBackend::S3 => {
      Blobs::S3(S3BlobStore::new(server_cfg.s3_bucket.clone(), server_cfg.aws_region.clone()))
    }
  };

  if server_cfg.openai_api_key.is_empty() {
    tracing::warn!("OPENAI_API_KEY is not set; generator outputs will fail");
  }
  let generator = OpenAiGenerator::new(
    server_cfg.openai_api_key.clone(),
    server_cfg.openai_model.clone(),
    server_cfg.openai_base_url.clone(),
  );

  let store = Arc::new(store);
  spawn_sweeper(store.clone(), Duration::from_secs(cli.sweep_interval.max(1)));

  let state: AppState<Production> = AppState {
    store,
    blob: Arc::new(blob),
    generator: Arc::new(generator),
    config: Arc::new(server_cfg.clone()),
  };

  let app = scribe_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Periodically delete rows whose `DeleteAt` has passed.
fn spawn_sweeper(store: Arc<SqliteStore>, every: Duration) {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    loop {
      ticker.tick().await;
      match store.purge_expired().await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "purged expired rows"),
        Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
      }
    }
  });
}
