use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::history::HistoryPolicy;

/// Browser origins allowed to call the API unless KREOL_CORS_ORIGINS says otherwise.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,https://mltoxic.vercel.app";

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded automatically at
/// startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding vectorizer.json and toxicity_model.json
    pub model_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    /// Allowed CORS origins; a single "*" allows any origin.
    pub cors_origins: Vec<String>,
    /// Supabase project URL (only needed with --record-history)
    pub supabase_url: String,
    /// Supabase service-role key (only needed with --record-history)
    pub supabase_service_key: String,
    pub history_policy: HistoryPolicy,
    /// Per-insert timeout for the history store
    pub history_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the Supabase pair, which is only
    /// checked when history recording is requested.
    pub fn load() -> Result<Self> {
        let port = match env::var("KREOL_PORT") {
            Ok(p) => p
                .parse()
                .with_context(|| format!("KREOL_PORT must be a port number, got {p:?}"))?,
            Err(_) => 8000,
        };

        let history_policy = match env::var("KREOL_HISTORY_POLICY") {
            Ok(p) => p.parse()?,
            Err(_) => HistoryPolicy::default(),
        };

        let history_timeout = match env::var("KREOL_HISTORY_TIMEOUT_SECS") {
            Ok(s) => Duration::from_secs(s.parse().with_context(|| {
                format!("KREOL_HISTORY_TIMEOUT_SECS must be whole seconds, got {s:?}")
            })?),
            Err(_) => Duration::from_secs(10),
        };

        let cors_origins = parse_origins(
            &env::var("KREOL_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        );

        Ok(Self {
            model_dir: Self::model_dir(),
            bind: env::var("KREOL_BIND").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            cors_origins,
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY").unwrap_or_default(),
            history_policy,
            history_timeout,
        })
    }

    /// The model directory alone: KREOL_MODEL_DIR or `./model`.
    ///
    /// Offline commands use this instead of `load()` so server-only settings
    /// can't stop them.
    pub fn model_dir() -> PathBuf {
        env::var("KREOL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::toxicity::artifacts::default_model_dir())
    }

    /// Check that the Supabase credentials are configured.
    /// Call this before starting a server that records search history.
    pub fn require_history(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.supabase_url.is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.supabase_service_key.is_empty() {
            missing.push("SUPABASE_SERVICE_KEY");
        }
        if !missing.is_empty() {
            anyhow::bail!(
                "{} not set. Add to your .env file, or run without --record-history.",
                missing.join(" and ")
            );
        }
        Ok(())
    }

    /// Check that the model artifacts exist before trying to serve them.
    pub fn require_model(&self) -> Result<()> {
        if !crate::toxicity::artifacts::artifact_files_present(&self.model_dir) {
            anyhow::bail!(
                "Model artifacts not found in {}\n\
                 Run `kreol-toxicity train` to create them, or set KREOL_MODEL_DIR.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
