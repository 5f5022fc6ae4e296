// Web server — Axum JSON API in front of the inference service.
//
// Routes:
//   POST /predict  classify a text (optionally recording it to history)
//   GET  /         service metadata
//   GET  /health   liveness probe
//
// The model is loaded before the listener binds; a server that can't load
// its artifacts never starts.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::history::{HistoryPolicy, HistoryStore};
use crate::inference::InferenceService;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
    /// Where served predictions get recorded, if anywhere.
    pub history: Option<Arc<dyn HistoryStore>>,
    pub history_policy: HistoryPolicy,
}

impl AppState {
    pub fn new(service: InferenceService) -> Self {
        Self {
            service: Arc::new(service),
            history: None,
            history_policy: HistoryPolicy::default(),
        }
    }

    pub fn with_history(mut self, store: Arc<dyn HistoryStore>, policy: HistoryPolicy) -> Self {
        self.history = Some(store);
        self.history_policy = policy;
        self
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(
    state: AppState,
    cors_origins: &[String],
    bind: &str,
    port: u16,
) -> Result<()> {
    let app = build_router(state, cors_origins);

    let addr = format!("{bind}:{port}");
    info!("Kreol Toxicity API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(health))
        .route("/predict", post(handlers::predict::predict))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured browser origins. A lone "*" opens it to any origin
/// (without credentials, which browsers refuse for wildcard origins).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(values))
        .allow_credentials(true)
}

/// Health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}
