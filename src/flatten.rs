//! Turns a search page into flat CSV rows.
//!
//! Retweets carry a truncated copy of the original, and replies only carry the
//! target's user id. Both are resolved against the page's `includes`, which the
//! API fills from the requested expansions.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::{
    twitter::types::{Includes, ReferenceKind, SearchResponse, Tweet, User},
    NOT_APPLICABLE,
};

/// Column names, in output order.
pub const HEADER: [&str; 17] = [
    "author id",
    "tweet_id",
    "created_at",
    "author_username",
    "tweet",
    "source",
    "num_text_chars",
    "reply_to_tweet_id",
    "reply_to_user_id",
    "reply_to_screen_name",
    "is_quote",
    "is_retweet",
    "reply_count",
    "retweet_count",
    "like_count",
    "quote_count",
    "lang",
];

/// Keyed view over one page's `includes`.
pub struct Inclusions<'a> {
    tweets: HashMap<&'a str, &'a Tweet>,
    users: HashMap<&'a str, &'a User>,
}

impl<'a> Inclusions<'a> {
    pub fn new(includes: &'a Includes) -> Self {
        Self {
            tweets: includes.tweets.iter().map(|t| (t.id.as_str(), t)).collect(),
            users: includes.users.iter().map(|u| (u.id.as_str(), u)).collect(),
        }
    }

    pub fn tweet(&self, id: &str) -> Option<&'a Tweet> {
        self.tweets.get(id).copied()
    }

    pub fn username(&self, user_id: &str) -> Option<&'a str> {
        self.users.get(user_id).map(|u| u.username.as_str())
    }
}

/// One output row. Field order is column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub author_id: String,
    pub tweet_id: String,
    pub created_at: String,
    pub author_username: String,
    pub tweet: String,
    pub source: String,
    pub num_text_chars: usize,
    #[serde(serialize_with = "or_na")]
    pub reply_to_tweet_id: Option<String>,
    #[serde(serialize_with = "or_na")]
    pub reply_to_user_id: Option<String>,
    #[serde(serialize_with = "or_na")]
    pub reply_to_screen_name: Option<String>,
    #[serde(serialize_with = "upper_bool")]
    pub is_quote: bool,
    #[serde(serialize_with = "upper_bool")]
    pub is_retweet: bool,
    pub reply_count: u64,
    pub retweet_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
    pub lang: String,
}

fn or_na<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(NOT_APPLICABLE))
}

fn upper_bool<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "TRUE" } else { "FALSE" })
}

/// Flatten every tweet in `page.data`, keeping API order.
///
/// `username` is the searched account; it stands in for the author handle
/// when the author is missing from `includes`.
pub fn flatten_page(page: &SearchResponse, username: &str) -> Vec<Record> {
    let inclusions = Inclusions::new(&page.includes);

    page.data
        .iter()
        .map(|tweet| flatten_tweet(tweet, &inclusions, username))
        .collect()
}

pub fn flatten_tweet(tweet: &Tweet, inclusions: &Inclusions<'_>, username: &str) -> Record {
    let reference = tweet.referenced_tweets.first();
    let kind = reference.map(|r| r.kind);

    let mut text = tweet.text.as_str();
    let mut metrics = tweet.public_metrics;

    if let (Some(ReferenceKind::Retweeted), Some(reference)) = (kind, reference) {
        match inclusions.tweet(&reference.id) {
            Some(original) => {
                text = &original.text;
                metrics = original.public_metrics;
            }
            None => tracing::warn!(
                tweet_id = %tweet.id,
                retweeted_id = %reference.id,
                "retweeted tweet missing from includes, keeping truncated text"
            ),
        }
    }

    let (reply_to_tweet_id, reply_to_user_id, reply_to_screen_name) = match (kind, reference) {
        (Some(ReferenceKind::RepliedTo), Some(reference)) => {
            let user_id = tweet.in_reply_to_user_id.clone();
            let screen_name = user_id
                .as_deref()
                .and_then(|id| inclusions.username(id))
                .map(str::to_string);

            if screen_name.is_none() {
                tracing::warn!(
                    tweet_id = %tweet.id,
                    in_reply_to_user_id = user_id.as_deref().unwrap_or(NOT_APPLICABLE),
                    "reply target user missing from includes"
                );
            }

            (Some(reference.id.clone()), user_id, screen_name)
        }
        _ => (None, None, None),
    };

    let author_username = inclusions
        .username(&tweet.author_id)
        .unwrap_or(username)
        .to_string();

    Record {
        author_id: tweet.author_id.clone(),
        tweet_id: tweet.id.clone(),
        created_at: tweet.created_at.clone(),
        author_username,
        tweet: text.to_string(),
        source: tweet.source.clone(),
        num_text_chars: text.chars().count(),
        reply_to_tweet_id,
        reply_to_user_id,
        reply_to_screen_name,
        is_quote: kind == Some(ReferenceKind::Quoted),
        is_retweet: kind == Some(ReferenceKind::Retweeted),
        reply_count: metrics.reply_count,
        retweet_count: metrics.retweet_count,
        like_count: metrics.like_count,
        quote_count: metrics.quote_count,
        lang: tweet.lang.clone(),
    }
}
