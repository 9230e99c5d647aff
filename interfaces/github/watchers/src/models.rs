use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Name of the field carrying response metadata on a fetched profile.
pub const META_FIELD: &str = "meta";

/// A watcher as listed by `/repos/{owner}/{repo}/subscribers`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatcherSummary {
    pub login: String,
}

/// One page of watchers for a repository. `page` is 0-based.
#[derive(Debug, Clone)]
pub struct WatcherPage {
    pub owner: String,
    pub repo: String,
    pub page: u32,
    pub watchers: Vec<WatcherSummary>,
    pub rate_limit: RateLimit,
}

/// Rate-limit snapshot read from the `x-ratelimit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i64>().ok())
        };

        Self {
            limit: number("x-ratelimit-limit").and_then(|n| u32::try_from(n).ok()),
            remaining: number("x-ratelimit-remaining").and_then(|n| u32::try_from(n).ok()),
            reset_at: number("x-ratelimit-reset").and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// Full profile of a GitHub user, kept as the raw field map returned by
/// `/users/{login}` plus a `meta` field describing the response.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    fields: Map<String, Value>,
}

impl UserProfile {
    pub fn new(mut fields: Map<String, Value>, meta: Map<String, Value>) -> Self {
        fields.insert(META_FIELD.to_string(), Value::Object(meta));
        Self { fields }
    }

    /// Removes the transport metadata so only the user entity remains.
    pub fn strip_meta(&mut self) -> Option<Value> {
        self.fields.remove(META_FIELD)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
