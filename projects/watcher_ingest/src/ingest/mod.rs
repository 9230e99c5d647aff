//! Fetch-and-store loop plus the two seams it runs against.

pub mod github;

use async_trait::async_trait;
use interfaces_github_watchers::models::{UserProfile, WatcherSummary};
use serde_json::{Map, Value};

/// Read access to a directory of users and the repositories they watch.
#[async_trait]
pub trait WatcherDirectory: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Watchers of `owner/repo` on the 0-based `page`.
    async fn watchers(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<WatcherSummary>, Self::Error>;

    async fn user_profile(&self, login: &str) -> Result<UserProfile, Self::Error>;
}

/// Row-oriented sink: each record becomes one row, keys are column names.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the number of rows written.
    async fn insert(&self, table: &str, record: Map<String, Value>) -> Result<usize, Self::Error>;
}
