// GET / — static service metadata.

use axum::response::IntoResponse;
use axum::Json;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Kreol Toxicity API is running",
        "endpoints": {
            "predict": "/predict",
            "health": "/health",
        }
    }))
}
