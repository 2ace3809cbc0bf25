use axum::{extract::{Query, State}, routing::get, Json, Router};
use mbsearch_core::{Corpus, Indexer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod query;
pub mod shutdown;

pub use query::{highlight_tokens, run_query, JsonResponse, MAX_OUTPUTS};
pub use shutdown::{spawn_shutdown_watcher, wait_for_shutdown};

#[derive(Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub indexing_complete: bool,
    pub documents: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub engine: Arc<dyn Indexer>,
    pub indexing_done: watch::Receiver<bool>,
}

fn cors_layer() -> CorsLayer {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

pub fn build_app(state: AppState, static_folder: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/json", get(json_handler));
    if let Some(dir) = static_folder {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn json_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Json<JsonResponse> {
    Json(run_query(&state.corpus, state.engine.as_ref(), &params.query))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        indexing_complete: *state.indexing_done.borrow(),
        documents: state.corpus.len(),
    })
}
