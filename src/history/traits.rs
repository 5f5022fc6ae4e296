// Search-history store trait — where served predictions get recorded.
//
// Recording is a side effect of serving, not part of the prediction itself.
// The web layer decides what a failed write means (see `HistoryPolicy`).

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One served prediction, as written to the `search_history` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    /// The normalized text that was classified.
    pub search_text: String,
    pub is_toxic: bool,
}

/// Trait for recording served predictions. Async because the real store is
/// a remote HTTP API.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a single prediction.
    async fn record(&self, record: &SearchRecord) -> Result<()>;
}
