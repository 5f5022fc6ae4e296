// Search history — optional record of every served prediction.
//
// SupabaseHistory implements the HistoryStore trait against Supabase's REST
// API. When no store is configured the service simply doesn't record.

pub mod supabase;
pub mod traits;

use std::str::FromStr;

pub use supabase::SupabaseHistory;
pub use traits::{HistoryStore, SearchRecord};

/// What a failed history write means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// Log the failure and still return the prediction (default).
    #[default]
    BestEffort,
    /// Drop the prediction and return a failure payload instead.
    Required,
}

impl FromStr for HistoryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            "required" => Ok(Self::Required),
            other => anyhow::bail!(
                "Unknown history policy {other:?} (expected \"best_effort\" or \"required\")"
            ),
        }
    }
}
