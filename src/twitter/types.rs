use serde::{de::DeserializeOwned, Deserialize, Deserializer};

/// Decode a value, falling back to `T::default()` when it is malformed.
///
/// Used for optional structures inside an otherwise good response, so one odd
/// tweet can't sink the whole page.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode a list element by element, dropping only the entries that don't fit.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let serde_json::Value::Array(entries) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(error) => {
                tracing::warn!(%error, "dropping malformed entry");
                None
            }
        })
        .collect())
}

/// Accept strings, numbers, or null for a text field.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Like [`loose_string`], but keeps "absent" distinct from "empty".
fn optional_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One page from `GET /2/tweets/search/all`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<Tweet>,
    #[serde(default, deserialize_with = "lenient")]
    pub includes: Includes,
    #[serde(default, deserialize_with = "lenient")]
    pub meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Includes {
    #[serde(default, deserialize_with = "lenient_list")]
    pub tweets: Vec<Tweet>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub result_count: Option<u64>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tweet {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub author_id: String,
    /// Kept as sent; the API already uses RFC 3339.
    #[serde(default, deserialize_with = "loose_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub lang: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub text: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient")]
    pub public_metrics: TweetMetrics,
    #[serde(default, deserialize_with = "lenient_list")]
    pub referenced_tweets: Vec<ReferencedTweet>,
    #[serde(default, deserialize_with = "optional_loose_string")]
    pub in_reply_to_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TweetMetrics {
    #[serde(default, deserialize_with = "lenient")]
    pub retweet_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub reply_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    #[serde(deserialize_with = "loose_string")]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Retweeted,
    Quoted,
    RepliedTo,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub username: String,
    #[serde(default, deserialize_with = "optional_loose_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "optional_loose_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub verified: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_page() {
        let json = r#"{
            "data": [{
                "id": "2",
                "author_id": "10",
                "created_at": "2021-03-04T05:06:07.000Z",
                "lang": "en",
                "text": "RT @bob: hi",
                "source": "Twitter Web App",
                "public_metrics": {"retweet_count": 5, "reply_count": 0, "like_count": 0, "quote_count": 0},
                "referenced_tweets": [{"type": "retweeted", "id": "1"}]
            }],
            "includes": {
                "tweets": [{"id": "1", "text": "hi"}],
                "users": [{"id": "10", "name": "Alice", "username": "alice", "verified": false}]
            },
            "meta": {"result_count": 1, "next_token": "abc"}
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].referenced_tweets[0].kind, ReferenceKind::Retweeted);
        assert_eq!(page.data[0].public_metrics.retweet_count, 5);
        assert_eq!(page.includes.tweets[0].text, "hi");
        assert_eq!(page.includes.users[0].username, "alice");
        assert_eq!(page.meta.result_count, Some(1));
        assert_eq!(page.meta.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_page_has_no_data_or_includes() {
        let page: SearchResponse = serde_json::from_str(r#"{"meta": {}}"#).unwrap();
        assert!(page.data.is_empty());
        assert!(page.includes.tweets.is_empty());
        assert_eq!(page.meta.result_count, None);
        assert_eq!(page.meta.next_token, None);
    }

    #[test]
    fn malformed_optional_fields_fall_back_to_defaults() {
        let json = r#"{
            "data": [{
                "id": "3",
                "text": "odd",
                "public_metrics": "n/a",
                "referenced_tweets": {"type": "quoted"}
            }],
            "includes": []
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.data[0].public_metrics, TweetMetrics::default());
        assert!(page.data[0].referenced_tweets.is_empty());
        assert!(page.includes.users.is_empty());
    }

    #[test]
    fn null_or_numeric_scalars_keep_the_entry() {
        let json = r#"{
            "data": [
                {"id": "1", "text": "good one", "lang": "en"},
                {"id": "2", "text": "odd one", "lang": null, "source": null,
                 "in_reply_to_user_id": 42,
                 "public_metrics": {"retweet_count": null, "like_count": 7}}
            ],
            "includes": {
                "tweets": [{"id": "1", "text": "hello"}, {"id": 99, "text": null}],
                "users": [{"id": "10", "username": "alice", "verified": "yes"}]
            }
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].lang, "");
        assert_eq!(page.data[1].in_reply_to_user_id.as_deref(), Some("42"));
        assert_eq!(page.data[1].public_metrics.retweet_count, 0);
        assert_eq!(page.data[1].public_metrics.like_count, 7);
        assert_eq!(page.includes.tweets.len(), 2);
        assert_eq!(page.includes.tweets[1].id, "99");
        assert_eq!(page.includes.users[0].verified, None);
    }

    #[test]
    fn bad_entry_is_dropped_without_losing_its_siblings() {
        let json = r#"{
            "data": [{"id": "1", "text": "kept"}, "not a tweet", {"id": "3", "text": "also kept"}],
            "includes": {"tweets": [42, {"id": "1", "text": "hello"}]}
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = page.data.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(page.includes.tweets.len(), 1);
        assert_eq!(page.includes.tweets[0].text, "hello");
    }

    #[test]
    fn unknown_reference_kind_is_tolerated() {
        let json = r#"[{"type": "edited", "id": "9"}]"#;
        let refs: Vec<ReferencedTweet> = serde_json::from_str(json).unwrap();
        assert_eq!(refs[0].kind, ReferenceKind::Unknown);
    }
}
