pub mod types;

use std::{env::consts, time::Duration};

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use thiserror::Error;

use crate::{config::Config, window::Window};

use self::types::SearchResponse;

const SEARCH_ALL_PATH: &str = "/2/tweets/search/all";

const EXPANSIONS: &str = "author_id,in_reply_to_user_id,referenced_tweets.id";
const TWEET_FIELDS: &str = "id,text,author_id,in_reply_to_user_id,conversation_id,created_at,lang,public_metrics,referenced_tweets,reply_settings,source";
const USER_FIELDS: &str = "id,name,username,created_at,description,public_metrics,verified";

/// The API answered with something other than 2xx.
#[derive(Debug, Error)]
#[error("Twitter API error: {status} {body}")]
pub struct ApiError {
    pub status: u16,
    pub body: String,
}

/// One search call: who, when, how many, and where to resume.
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub username: &'a str,
    pub window: &'a Window,
    pub max_results: u32,
    pub next_token: Option<&'a str>,
}

impl SearchQuery<'_> {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", format!("from:{}", self.username)),
            ("start_time", self.window.start_param()),
            ("end_time", self.window.end_param()),
            ("max_results", self.max_results.to_string()),
            ("expansions", EXPANSIONS.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("user.fields", USER_FIELDS.to_string()),
        ];

        if let Some(token) = self.next_token {
            params.push(("next_token", token.to_string()));
        }

        params
    }
}

pub struct TwitterClient {
    client: reqwest::Client,
    base_url: String,
}

impl TwitterClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert("accept", "application/json".parse()?);
        headers.insert(
            "user-agent",
            format!(
                "{}/{} on {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                consts::OS
            )
            .parse()?,
        );

        let mut auth: reqwest::header::HeaderValue =
            format!("Bearer {}", config.bearer_token).parse()?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn twitter_request<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);

        let response = self.client.get(url).query(query).send().await?;
        tracing::debug!(status = %response.status(), path, "endpoint responded");

        let response = match response {
            response if response.status().is_success() => response,
            response => {
                let status = response.status().as_u16();
                let body = response.text().await?;

                return Err(ApiError { status, body }.into());
            }
        };

        let bytes = response.bytes().await?;

        match serde_json::from_slice(&bytes) {
            Ok(base) => Ok(base),
            Err(_) => {
                let error = String::from_utf8_lossy(&bytes);

                Err(anyhow!("Failed to parse response: {error}"))
            }
        }
    }

    /// Fetch one page of full-archive search results.
    pub async fn search_all(&self, query: &SearchQuery<'_>) -> Result<SearchResponse> {
        self.twitter_request(SEARCH_ALL_PATH, &query.params()).await
    }
}
