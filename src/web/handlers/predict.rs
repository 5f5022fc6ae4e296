// POST /predict — classify one text.
//
// Without a history store the body is just {label, confidence}. With one,
// every response carries a status. A failed history write never changes the
// prediction itself; the HistoryPolicy decides whether the caller still
// gets it (best effort, with `history_error` set) or gets a failure payload
// instead (required).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::history::{HistoryPolicy, SearchRecord};
use crate::inference::{Label, Prediction};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    /// No history store configured.
    pub fn plain(prediction: &Prediction) -> Self {
        Self {
            status: None,
            label: Some(prediction.label),
            confidence: Some(prediction.confidence),
            history_error: None,
            error: None,
        }
    }

    /// Prediction served and recorded.
    pub fn recorded(prediction: &Prediction) -> Self {
        Self {
            status: Some(Status::Success),
            ..Self::plain(prediction)
        }
    }

    /// Prediction served, history write failed.
    pub fn unrecorded(prediction: &Prediction, error: String) -> Self {
        Self {
            history_error: Some(error),
            ..Self::recorded(prediction)
        }
    }

    /// History write failed and the policy requires it.
    pub fn failed(error: String) -> Self {
        Self {
            status: Some(Status::Failed),
            label: None,
            confidence: None,
            history_error: None,
            error: Some(error),
        }
    }
}

pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Json<PredictResponse> {
    let prediction = state.service.predict(&request.text);

    let Some(history) = &state.history else {
        return Json(PredictResponse::plain(&prediction));
    };

    let record = SearchRecord {
        search_text: prediction.text.clone(),
        is_toxic: prediction.label.is_toxic(),
    };

    match history.record(&record).await {
        Ok(()) => Json(PredictResponse::recorded(&prediction)),
        Err(e) => {
            let message = format!("{e:#}");
            warn!(error = %message, policy = ?state.history_policy, "Failed to record search history");
            match state.history_policy {
                HistoryPolicy::BestEffort => Json(PredictResponse::unrecorded(&prediction, message)),
                HistoryPolicy::Required => Json(PredictResponse::failed(message)),
            }
        }
    }
}
