use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DATA_PATH: &str = "quiz-data.json";
const DEFAULT_DB_PATH: &str = "quiz-progress.sqlite";
const DEFAULT_SESSION_DB_PATH: &str = "quiz-sessions.sqlite";
const DEFAULT_TRANSITION_MS: u64 = 75;
const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number of milliseconds, got '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings. The bot token itself is read by `Bot::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub db_path: String,
    /// Where each chat's screen and history live. Must differ from `db_path`.
    pub session_db_path: String,
    /// How long the outbound transition plays after an answer.
    pub transition: Duration,
    /// Give up waiting for a transition after this long.
    pub transition_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(Duration::from_millis(default)),
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::Invalid { key, value }),
            }
        };

        Ok(Self {
            data_path: lookup("QUIZ_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            db_path: lookup("QUIZ_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            session_db_path: lookup("QUIZ_SESSION_DB_PATH")
                .unwrap_or_else(|| DEFAULT_SESSION_DB_PATH.to_string()),
            transition: millis("QUIZ_TRANSITION_MS", DEFAULT_TRANSITION_MS)?,
            transition_timeout: millis("QUIZ_TRANSITION_TIMEOUT_MS", DEFAULT_TRANSITION_TIMEOUT_MS)?,
        })
    }
}
