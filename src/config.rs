use anyhow::{Context, Result};
use std::path::PathBuf;

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub pipeline_path: PathBuf,
    pub label_encoder_path: PathBuf,
    pub port: u16,
    /// Log a summary of every prediction (`LOG_PRED=1`).
    pub log_predictions: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        let port = match lookup("PORT") {
            Some(s) => s
                .parse()
                .with_context(|| format!("PORT must be a port number, got {s:?}"))?,
            None => 8080,
        };

        Ok(Self {
            pipeline_path: path("PIPELINE_PATH", "obesity_pipeline.json"),
            label_encoder_path: path("LABEL_ENCODER_PATH", "label_encoder.json"),
            port,
            log_predictions: lookup("LOG_PRED").as_deref() == Some("1"),
        })
    }
}
