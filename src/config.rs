//! Runtime configuration
//!
//! Read from the process environment (after `.env` has been loaded by the
//! binaries). Every field has a default so the demo runs with nothing set.

use crate::error::ReportError;
use crate::execution::ExecutionConfig;
use crate::quality::{DEFAULT_MAIN_THRESHOLD, DEFAULT_MINIMUM_QUALITY};
use crate::Result;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enables the Gemini planner when set
    pub gemini_api_key: Option<String>,
    pub dart_api_key: Option<String>,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
    /// Use live providers instead of demo data
    pub live_tools: bool,
    pub http_timeout_secs: u64,
    pub execution: ExecutionConfig,
    pub api_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            dart_api_key: None,
            naver_client_id: None,
            naver_client_secret: None,
            live_tools: false,
            http_timeout_secs: 5,
            execution: ExecutionConfig::default(),
            api_port: 8080,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match non_empty(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ReportError::ConfigError(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let minimum_quality = parse_var("REPORT_MIN_QUALITY", DEFAULT_MINIMUM_QUALITY)?;
        let main_threshold = parse_var("REPORT_MAIN_THRESHOLD", DEFAULT_MAIN_THRESHOLD)?;
        if minimum_quality > main_threshold {
            return Err(ReportError::ConfigError(format!(
                "REPORT_MIN_QUALITY ({}) must not exceed REPORT_MAIN_THRESHOLD ({})",
                minimum_quality, main_threshold
            )));
        }

        let api_port = match non_empty("PORT") {
            Some(_) => parse_var("PORT", defaults.api_port)?,
            None => parse_var("API_PORT", defaults.api_port)?,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            dart_api_key: non_empty("DART_API_KEY"),
            naver_client_id: non_empty("NAVER_CLIENT_ID"),
            naver_client_secret: non_empty("NAVER_CLIENT_SECRET"),
            live_tools: parse_var("REPORT_LIVE_TOOLS", defaults.live_tools)?,
            http_timeout_secs: parse_var("REPORT_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            execution: ExecutionConfig {
                minimum_quality,
                main_threshold,
            },
            api_port,
        })
    }
}
