pub mod repo_watchers;

use async_trait::async_trait;
use interfaces_github_watchers::{
    index::{FetchRepoWatchersError, FetchUserProfileError, GitHubClient},
    models::{UserProfile, WatcherSummary},
};
use thiserror::Error;
use tracing::debug;

use crate::ingest::WatcherDirectory;

#[derive(Debug, Error)]
pub enum GitHubDirectoryError {
    #[error("FetchRepoWatchers: {source}")]
    FetchRepoWatchers {
        #[from]
        source: FetchRepoWatchersError,
    },

    #[error("FetchUserProfile: {source}")]
    FetchUserProfile {
        #[from]
        source: FetchUserProfileError,
    },
}

#[async_trait]
impl WatcherDirectory for GitHubClient {
    type Error = GitHubDirectoryError;

    async fn watchers(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<WatcherSummary>, Self::Error> {
        let page = self.fetch_repo_watchers(owner, repo, page).await?;
        debug!(
            page = page.page,
            watchers = page.watchers.len(),
            remaining = ?page.rate_limit.remaining,
            reset_at = ?page.rate_limit.reset_at,
            "watchers page received"
        );
        Ok(page.watchers)
    }

    async fn user_profile(&self, login: &str) -> Result<UserProfile, Self::Error> {
        Ok(self.fetch_user_profile(login).await?)
    }
}
