use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::error::ConfigError;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_UPSTREAM_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_UPSTREAM_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TYPING_DELAY_MS: u64 = 10;

/// Which origins the chat endpoint answers cross-origin requests for.
#[derive(Debug, Clone, PartialEq)]
pub enum CorsPolicy {
    Any,
    Origins(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub bind: SocketAddr,
    pub upstream_model: String,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub cors: CorsPolicy,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_blank(&lookup, API_KEY_ENV).ok_or(ConfigError::Missing(API_KEY_ENV))?;
        // The key travels as a header value on every upstream call.
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(ConfigError::Invalid {
                key: API_KEY_ENV,
                value: "<redacted>".to_string(),
                reason: "contains characters not allowed in an HTTP header".to_string(),
            });
        }

        let bind = parse_or(&lookup, "MODEL_HUB_BIND", SocketAddr::from(([127, 0, 0, 1], 8000)))?;
        let upstream_timeout =
            Duration::from_secs(parse_or(&lookup, "MODEL_HUB_UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);

        let cors = match non_blank(&lookup, "MODEL_HUB_CORS_ORIGINS") {
            None => CorsPolicy::Any,
            Some(raw) if raw == "*" => CorsPolicy::Any,
            Some(raw) => CorsPolicy::Origins(
                raw.split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            ),
        };

        Ok(Self {
            api_key,
            bind,
            upstream_model: non_blank(&lookup, "MODEL_HUB_UPSTREAM_MODEL")
                .unwrap_or_else(|| DEFAULT_UPSTREAM_MODEL.to_string()),
            upstream_url: non_blank(&lookup, "MODEL_HUB_UPSTREAM_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            upstream_timeout,
            cors,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiVariant {
    /// Model picker, per-model settings, Markdown and typing reveal.
    Hub,
    /// One plain transcript, no decoration.
    Plain,
}

impl FromStr for UiVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hub" => Ok(Self::Hub),
            "plain" => Ok(Self::Plain),
            other => Err(format!("expected 'hub' or 'plain', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub typing_delay: Duration,
    pub variant: UiVariant,
}

impl UiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = non_blank(&lookup, "BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "BACKEND_URL",
                value: backend_url,
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let request_timeout =
            Duration::from_secs(parse_or(&lookup, "MODEL_HUB_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);
        let typing_delay =
            Duration::from_millis(parse_or(&lookup, "MODEL_HUB_TYPING_DELAY_MS", DEFAULT_TYPING_DELAY_MS)?);
        let variant = parse_or(&lookup, "MODEL_HUB_UI", UiVariant::Hub)?;

        Ok(Self {
            backend_url,
            request_timeout,
            typing_delay,
            variant,
        })
    }
}

fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses `key` when it is set, otherwise returns `default`.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
            value: raw,
        }),
    }
}
