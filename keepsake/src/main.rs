use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keepsake::api::dto::UploadMemoryRequest;
use keepsake::api::{create_router, AppState};
use keepsake::config::{Config, LogFormat};
use keepsake::db::{Database, DatabaseBackend, LibSqlBackend};
use keepsake::models::IngestOptions;

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "Self-hostable backend for photo-memory journals")]
struct Args {
    /// JSON array of memories to ingest when the store is empty
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,

    /// Override KEEPSAKE_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override KEEPSAKE_PORT
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keepsake=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(url = %config.database.url, "Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    let cancel_token = CancellationToken::new();
    let state = AppState::new(config.clone(), db.clone(), cancel_token.child_token());

    if let Some(path) = &args.seed {
        seed_from_file(&state, path).await?;
    }

    let indexed = state.timeline.rebuild_all().await?;
    tracing::info!(entries = indexed, "Timeline warmed up");

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Keepsake starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("Server drained, flushing store...");
    db.flush().await?;

    Ok(())
}

async fn seed_from_file(state: &AppState, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let requests: Vec<UploadMemoryRequest> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;

    let options = IngestOptions::from(&state.config.media);
    let mut memories = Vec::with_capacity(requests.len());
    for (index, request) in requests.into_iter().enumerate() {
        let (memory, skipped) = request
            .into_new_memory(&options)
            .with_context(|| format!("seed entry {index} is invalid"))?;
        if !skipped.is_empty() {
            tracing::warn!(index, skipped = skipped.len(), "Seed entry has undecodable images");
        }
        memories.push(memory);
    }

    let stored = state.memory.seed(memories).await?;
    tracing::info!(stored, path = %path.display(), "Seed file processed");
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
