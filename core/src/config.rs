//! Client configuration.
//!
//! The base origin is always injected; nothing reads the environment unless
//! `ClientConfig::from_env` is called explicitly.

use std::str::FromStr;

use crate::error::ApiError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

pub const ENV_ORIGIN: &str = "STOREFRONT_API_ORIGIN";
pub const ENV_ERROR_STYLE: &str = "STOREFRONT_ERROR_STYLE";
pub const ENV_CONTENT_TYPE: &str = "STOREFRONT_CONTENT_TYPE";

/// How failures are turned into display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStyle {
    /// Curated Portuguese messages keyed on status code and known details.
    #[default]
    Friendly,
    /// Raw dump of the detail: field paths, messages and types.
    Detailed,
}

impl FromStr for ErrorStyle {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" => Ok(ErrorStyle::Friendly),
            "detailed" | "debug" => Ok(ErrorStyle::Detailed),
            other => Err(ApiError::Config(format!("unknown error style: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub error_style: ErrorStyle,
    pub default_content_type: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            error_style: ErrorStyle::default(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_error_style(mut self, style: ErrorStyle) -> Self {
        self.error_style = style;
        self
    }

    pub fn with_default_content_type(mut self, content_type: &str) -> Self {
        self.default_content_type = content_type.to_string();
        self
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. The origin is required; the other
    /// keys fall back to their defaults when unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_ORIGIN).ok_or_else(|| ApiError::Config(format!("{ENV_ORIGIN} is not set")))?;
        url::Url::parse(&base_url).map_err(|e| ApiError::Config(format!("{ENV_ORIGIN}: {e}")))?;

        let mut config = Self::new(&base_url);
        if let Some(style) = get(ENV_ERROR_STYLE) {
            config.error_style = style.parse()?;
        }
        if let Some(content_type) = get(ENV_CONTENT_TYPE) {
            config.default_content_type = content_type;
        }
        Ok(config)
    }
}
