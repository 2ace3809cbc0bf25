use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use mbsearch_core::{Corpus, Indexer, MemoryIndexer};
use mbsearch_indexer::spawn_indexing;
use mbsearch_server::{build_app, spawn_shutdown_watcher, wait_for_shutdown, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory of crawler output files
    #[arg(long, default_value = "./testdata/weibo")]
    corpus: PathBuf,
    /// Directory served for every non-API path
    #[arg(long, default_value = "static")]
    static_folder: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    std::fs::read_dir(&args.corpus)
        .with_context(|| format!("corpus directory {} is unreadable", args.corpus.display()))?;

    let corpus = Arc::new(Corpus::new());
    let engine: Arc<dyn Indexer> = Arc::new(MemoryIndexer::new());

    tracing::info!(corpus = %args.corpus.display(), "indexing in background");
    let indexing = spawn_indexing(args.corpus.clone(), corpus.clone(), engine.clone());
    let state = AppState { corpus, engine: engine.clone(), indexing_done: indexing.status() };
    tokio::spawn(async move {
        match indexing.wait().await {
            Ok(report) => tracing::info!(docs = report.documents_indexed, "index ready"),
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::error!(error = %reason, "indexing did not complete");
            }
        }
    });

    // closing the engine also stops an unfinished ingestion pass at its next file
    let shutdown = spawn_shutdown_watcher(tokio::signal::ctrl_c(), engine);
    let app: Router = build_app(state, Some(args.static_folder));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await?;
    tracing::info!("server stopped");
    Ok(())
}
