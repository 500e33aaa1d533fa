use std::{env, time::Duration};

use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

const DEFAULT_OPENAI_API_KEY: &str = "openai_api_key";
const DEFAULT_ASSISTANT_ID: &str = "assistant_id";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub questions_collection: String,
    pub themes_collection: String,
    pub leaderboard_collection: String,
    pub openai_api_key: SecretString,
    pub openai_api_base: String,
    pub assistant_id: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub lock_timeout_secs: u64,
    pub run_poll_interval_ms: u64,
    pub run_poll_max_interval_ms: u64,
    pub run_timeout_secs: u64,
    pub max_generation_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "mcq-local".to_string()),
            questions_collection: env::var("QUESTIONS_COLLECTION")
                .unwrap_or_else(|_| "mcqs".to_string()),
            themes_collection: env::var("THEMES_COLLECTION")
                .unwrap_or_else(|_| "themes".to_string()),
            leaderboard_collection: env::var("LEADERBOARD_COLLECTION")
                .unwrap_or_else(|_| "leaderboard".to_string()),
            openai_api_key: SecretString::from(
                env::var("OPENAI_API_KEY").unwrap_or_else(|_| DEFAULT_OPENAI_API_KEY.to_string()),
            ),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            assistant_id: env::var("ASSISTANT_ID")
                .unwrap_or_else(|_| DEFAULT_ASSISTANT_ID.to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT", 5000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]),
            lock_timeout_secs: parse_env("LOCK_TIMEOUT_SECS", 300),
            run_poll_interval_ms: parse_env("RUN_POLL_INTERVAL_MS", 500),
            run_poll_max_interval_ms: parse_env("RUN_POLL_MAX_INTERVAL_MS", 2000),
            run_timeout_secs: parse_env("RUN_TIMEOUT_SECS", 180),
            max_generation_retries: parse_env("MAX_GENERATION_RETRIES", 2),
        }
    }

    /// Rejects placeholder credentials before the server starts taking traffic.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if self.openai_api_key.expose_secret() == DEFAULT_OPENAI_API_KEY {
            return Err(AppError::Configuration(
                "OPENAI_API_KEY is using its default value".to_string(),
            ));
        }

        if self.assistant_id == DEFAULT_ASSISTANT_ID || self.assistant_id.trim().is_empty() {
            return Err(AppError::Configuration(
                "ASSISTANT_ID is not set".to_string(),
            ));
        }

        if self.max_generation_retries > 10 {
            return Err(AppError::Configuration(format!(
                "MAX_GENERATION_RETRIES is too large ({})",
                self.max_generation_retries
            )));
        }

        Ok(())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            lock_timeout: Duration::from_secs(self.lock_timeout_secs),
            run_poll_interval: Duration::from_millis(self.run_poll_interval_ms),
            run_poll_max_interval: Duration::from_millis(self.run_poll_max_interval_ms),
            run_timeout: Duration::from_secs(self.run_timeout_secs),
            max_retries: self.max_generation_retries,
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "mcq-test".to_string(),
            questions_collection: "mcqs".to_string(),
            themes_collection: "themes".to_string(),
            leaderboard_collection: "leaderboard".to_string(),
            openai_api_key: SecretString::from("sk-test".to_string()),
            openai_api_base: "http://127.0.0.1:9".to_string(),
            assistant_id: "asst_test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 5000,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            lock_timeout_secs: 5,
            run_poll_interval_ms: 10,
            run_poll_max_interval_ms: 40,
            run_timeout_secs: 5,
            max_generation_retries: 2,
        }
    }
}

/// Timing and retry knobs for a generation sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationSettings {
    pub lock_timeout: Duration,
    pub run_poll_interval: Duration,
    pub run_poll_max_interval: Duration,
    pub run_timeout: Duration,
    pub max_retries: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(300),
            run_poll_interval: Duration::from_millis(500),
            run_poll_max_interval: Duration::from_secs(2),
            run_timeout: Duration::from_secs(180),
            max_retries: 2,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
