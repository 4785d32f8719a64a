use thiserror::Error;

pub const TWITTER_API_BASE_URL: &str = "https://api.twitter.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bearer_token: String,
    pub base_url: String,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// `.env` loading is left to the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        // `env::var` is generic over its key, so it can't stand in for
        // `for<'a> Fn(&'a str)` directly
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build the configuration from an arbitrary env-var lookup, so tests
    /// don't have to touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let bearer_token = lookup("TWITTER_BEARER_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TWITTER_BEARER_TOKEN".to_string()))?;

        if bearer_token.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: "TWITTER_BEARER_TOKEN".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let base_url = lookup("TWITTER_API_BASE_URL")
            .unwrap_or_else(|_| TWITTER_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidEnvVar {
                var: "TWITTER_API_BASE_URL".to_string(),
                reason: format!("`{base_url}` is not an http(s) URL"),
            });
        }

        Ok(Self {
            bearer_token,
            base_url,
        })
    }
}
