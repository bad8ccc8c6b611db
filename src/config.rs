use crate::storage::STORAGE_KEY;
use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ADVICE_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ADVICE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub advice_api_key: Option<String>,
    pub advice_model: String,
    pub advice_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: env::var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_path()),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            advice_api_key: non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY")),
            advice_model: non_empty_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_ADVICE_MODEL.into()),
            advice_endpoint: non_empty_var("ADVICE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ADVICE_ENDPOINT.into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            port: DEFAULT_PORT,
            advice_api_key: None,
            advice_model: DEFAULT_ADVICE_MODEL.into(),
            advice_endpoint: DEFAULT_ADVICE_ENDPOINT.into(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from(format!("data/{STORAGE_KEY}.json"))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
