// HTTP API tests — drive the axum Router in-process with tower's oneshot.
//
// The history store is replaced by in-memory fakes so both the success and
// failure paths of each HistoryPolicy can be checked without a network.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use kreol_toxicity::config::{parse_origins, DEFAULT_CORS_ORIGINS};
use kreol_toxicity::features::{TfidfVectorizer, VectorizerParams};
use kreol_toxicity::history::{HistoryPolicy, HistoryStore, SearchRecord};
use kreol_toxicity::inference::InferenceService;
use kreol_toxicity::toxicity::artifacts::ModelArtifacts;
use kreol_toxicity::toxicity::classifier::LogisticRegression;
use kreol_toxicity::web::{build_router, AppState};

/// Records every write in memory.
#[derive(Default)]
struct MemoryHistory {
    records: Mutex<Vec<SearchRecord>>,
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, record: &SearchRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Fails every write.
struct BrokenHistory;

#[async_trait]
impl HistoryStore for BrokenHistory {
    async fn record(&self, _record: &SearchRecord) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

/// "kouyon" pushes toward toxic; everything else sits on the bias.
fn service() -> InferenceService {
    let corpus: Vec<String> = [
        "to enn kouyon",
        "to enn kouyon sa",
        "bonzour mo kamarad",
        "bonzour mo fami",
        "mersi mo kamarad",
        "mersi bonzour",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let vectorizer = TfidfVectorizer::fit(&corpus, VectorizerParams::default()).unwrap();
    let mut weights = vec![0.0; vectorizer.n_features()];
    weights[vectorizer.index_of("kouyon").unwrap()] = 6.0;
    let classifier = LogisticRegression::from_parameters(weights, -1.0);
    InferenceService::new(ModelArtifacts::new(vectorizer, classifier).unwrap())
}

fn router(state: AppState) -> Router {
    build_router(state, &parse_origins(DEFAULT_CORS_ORIGINS))
}

async fn post_predict(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================
// POST /predict without history
// ============================================================

#[tokio::test]
async fn predict_returns_label_and_confidence_only() {
    let app = router(AppState::new(service()));
    let (status, body) = post_predict(app, r#"{"text": "To enn KOUYON"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "toxic");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!(confidence > 0.5 && confidence <= 1.0);
    assert_eq!(body.as_object().unwrap().len(), 2, "unexpected fields: {body}");
}

#[tokio::test]
async fn predict_unknown_text_uses_bias() {
    let app = router(AppState::new(service()));
    let (status, body) = post_predict(app, r#"{"text": "  HELLO world  "}"#).await;

    assert_eq!(status, StatusCode::OK);
    // sigmoid(-1.0) = 0.2689...
    assert_eq!(body, json!({ "label": "non_toxic", "confidence": 0.269 }));
}

#[tokio::test]
async fn predict_empty_text_is_well_defined() {
    let app = router(AppState::new(service()));
    let (status, body) = post_predict(app, r#"{"text": ""}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence"].as_f64(), Some(0.269));
}

#[tokio::test]
async fn predict_missing_text_is_rejected() {
    let app = router(AppState::new(service()));
    let (status, _) = post_predict(app, r#"{"message": "hi"}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn predict_malformed_json_is_rejected() {
    let app = router(AppState::new(service()));
    let (status, _) = post_predict(app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================
// POST /predict with history
// ============================================================

#[tokio::test]
async fn predict_records_normalized_text() {
    let store = Arc::new(MemoryHistory::default());
    let state = AppState::new(service()).with_history(store.clone(), HistoryPolicy::BestEffort);
    let (status, body) = post_predict(router(state), r#"{"text": "  KOUYON  "}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["label"], "toxic");
    assert!(body.get("history_error").is_none());

    let records = store.records.lock().unwrap();
    assert_eq!(
        *records,
        vec![SearchRecord {
            search_text: "kouyon".to_string(),
            is_toxic: true,
        }]
    );
}

#[tokio::test]
async fn best_effort_history_failure_still_returns_prediction() {
    let state =
        AppState::new(service()).with_history(Arc::new(BrokenHistory), HistoryPolicy::BestEffort);
    let (status, body) = post_predict(router(state), r#"{"text": "bonzour"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["label"], "non_toxic");
    assert_eq!(body["confidence"].as_f64(), Some(0.269));
    assert!(body["history_error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn required_history_failure_returns_failure_payload() {
    let state =
        AppState::new(service()).with_history(Arc::new(BrokenHistory), HistoryPolicy::Required);
    let (status, body) = post_predict(router(state), r#"{"text": "bonzour"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "failed", "error": "connection refused" })
    );
}

// ============================================================
// Metadata, health, CORS
// ============================================================

#[tokio::test]
async fn root_lists_endpoints() {
    let (status, body) = get_json(router(AppState::new(service())), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Kreol Toxicity API is running");
    assert_eq!(body["endpoints"]["predict"], "/predict");
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = get_json(router(AppState::new(service())), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = router(AppState::new(service()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn cors_ignores_unlisted_origin() {
    let app = router(AppState::new(service()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
