use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use scheduler_client::{ClientConfig, DEFAULT_BASE_URL, normalize_base_url};

const DEFAULT_TOKEN_FILE: &str = ".scheduler_token";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token_file: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("SCHEDULER_API_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token_file = lookup("SCHEDULER_TOKEN_FILE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string());
        let connect_timeout_secs =
            parse_u64(&lookup, "SCHEDULER_CONNECT_TIMEOUT_SECS", 5)?;
        let request_timeout_secs =
            parse_u64(&lookup, "SCHEDULER_REQUEST_TIMEOUT_SECS", 15)?;
        let log_level = lookup("LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url: normalize_base_url(&api_url),
            token_file: PathBuf::from(token_file),
            connect_timeout_secs,
            request_timeout_secs,
            log_level,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
