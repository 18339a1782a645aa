// src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    Missing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProviderKind {
    /// Google Identity Toolkit `accounts:lookup` verification
    IdentityToolkit,
    /// Fixed token -> uid pairs from AUTH_STATIC_TOKENS (development/testing)
    Static,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub data_dir: PathBuf,
    pub workers: Option<usize>,
    pub cors_allowed_origin: Option<String>,

    pub search_cache_ttl: Duration,
    pub max_query_len: usize,
    pub max_upload_bytes: usize,

    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub transcription_model: String,
    pub therapist_model: String,
    pub ai_timeout: Duration,

    pub auth_provider: AuthProviderKind,
    pub firebase_api_key: Option<String>,
    pub static_tokens: Vec<(String, String)>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            public_base_url: "http://127.0.0.1:5000".to_string(),
            data_dir: default_data_dir(),
            workers: None,
            cors_allowed_origin: None,
            search_cache_ttl: Duration::from_secs(60),
            max_query_len: 100,
            max_upload_bytes: 25 * 1024 * 1024,
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            transcription_model: "gemini-1.5-flash".to_string(),
            therapist_model: "gemini-1.5-flash".to_string(),
            ai_timeout: Duration::from_secs(60),
            auth_provider: AuthProviderKind::IdentityToolkit,
            firebase_api_key: None,
            static_tokens: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load from the process environment, reading `.env` first unless
    /// `NO_DOTENV` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let skip_dotenv = env::var("NO_DOTENV")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);
        if !skip_dotenv {
            dotenvy::dotenv().ok();
        }

        let mut config = Self::default();

        if let Ok(host) = env::var("BACKEND_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16>("BACKEND_PORT")? {
            config.port = port;
        }
        config.public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", config.host, config.port));
        if let Ok(dir) = env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.workers = parse_var::<usize>("ACTIX_WORKERS")?;
        config.cors_allowed_origin = non_empty_var("CORS_ALLOWED_ORIGIN");

        if let Some(secs) = parse_var::<u64>("SEARCH_CACHE_TTL_SECS")? {
            config.search_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(len) = parse_var::<usize>("SEARCH_MAX_QUERY_LEN")? {
            if len == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "SEARCH_MAX_QUERY_LEN".into(),
                    value: "0".into(),
                });
            }
            config.max_query_len = len;
        }
        if let Some(bytes) = parse_var::<usize>("MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = bytes;
        }

        config.gemini_api_key = non_empty_var("GEMINI_API_KEY");
        if let Some(url) = non_empty_var("GEMINI_BASE_URL") {
            config.gemini_base_url = url;
        }
        if let Some(model) = non_empty_var("GEMINI_TRANSCRIPTION_MODEL") {
            config.transcription_model = model;
        }
        if let Some(model) = non_empty_var("GEMINI_THERAPIST_MODEL") {
            config.therapist_model = model;
        }
        if let Some(secs) = parse_var::<u64>("AI_TIMEOUT_SECS")? {
            config.ai_timeout = Duration::from_secs(secs);
        }

        config.firebase_api_key = non_empty_var("FIREBASE_API_KEY");
        if let Some(raw) = non_empty_var("AUTH_STATIC_TOKENS") {
            config.static_tokens = parse_static_tokens(&raw)?;
        }
        config.auth_provider = match env::var("AUTH_PROVIDER")
            .unwrap_or_else(|_| "identity_toolkit".to_string())
            .to_lowercase()
            .as_str()
        {
            "identity_toolkit" | "firebase" => AuthProviderKind::IdentityToolkit,
            "static" => AuthProviderKind::Static,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "AUTH_PROVIDER".into(),
                    value: other.to_string(),
                })
            }
        };
        if config.auth_provider == AuthProviderKind::IdentityToolkit
            && config.firebase_api_key.is_none()
        {
            return Err(ConfigError::Missing("FIREBASE_API_KEY".into()));
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("journal.db")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("audio-journal")
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match non_empty_var(key) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

/// Parse `token:uid,token:uid`.
pub fn parse_static_tokens(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((token, uid)) if !token.trim().is_empty() && !uid.trim().is_empty() => {
                Ok((token.trim().to_string(), uid.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidValue {
                key: "AUTH_STATIC_TOKENS".into(),
                value: pair.to_string(),
            }),
        })
        .collect()
}
