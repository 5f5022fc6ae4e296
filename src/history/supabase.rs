// Supabase implementation of the search-history store.
//
// Inserts go through Supabase's PostgREST endpoint:
//   POST {SUPABASE_URL}/rest/v1/search_history
// authenticated with the service key as both `apikey` and bearer token.
// There is no retry: a failed insert is reported once and the caller's
// HistoryPolicy decides what happens next.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::traits::{HistoryStore, SearchRecord};

/// Table that receives one row per served prediction.
pub const SEARCH_HISTORY_TABLE: &str = "search_history";

/// Supabase-backed search history.
pub struct SupabaseHistory {
    client: Client,
    insert_url: String,
    service_key: String,
}

impl SupabaseHistory {
    /// Create a store for the project at `base_url` with the given service key.
    ///
    /// `timeout` bounds each insert so a stalled store can't hang a request.
    pub fn new(base_url: &str, service_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Supabase HTTP client")?;

        Ok(Self {
            client,
            insert_url: insert_url(base_url),
            service_key,
        })
    }
}

fn insert_url(base_url: &str) -> String {
    format!(
        "{}/rest/v1/{}",
        base_url.trim_end_matches('/'),
        SEARCH_HISTORY_TABLE
    )
}

#[async_trait]
impl HistoryStore for SupabaseHistory {
    async fn record(&self, record: &SearchRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.insert_url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("Failed to call Supabase")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase insert returned {}: {}", status, body);
        }

        debug!(is_toxic = record.is_toxic, "Recorded search history");
        Ok(())
    }
}
