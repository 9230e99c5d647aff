use interfaces_github_watchers::index::{AuthenticateError, GitHubClient};
use projects_watcher_ingest::{
    config::{Config, ConfigError},
    db::store::{ConnectStoreError, Store},
    ingest::github::repo_watchers::index::{ingest_repo_watchers, IngestTarget},
};
use thiserror::Error;
use tracing::{info, warn};
use utils_trace::tracing_init;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("TracingInit: {source}")]
    TracingInit {
        #[source]
        source: utils_trace::TracingInitError,
    },
    #[error("LoadConfig: {source}")]
    LoadConfig {
        #[source]
        source: ConfigError,
    },
    #[error("ConnectStore: {source}")]
    ConnectStore {
        #[source]
        source: ConnectStoreError,
    },
    #[error("Authenticate: {source}")]
    Authenticate {
        #[source]
        source: AuthenticateError,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MainError> {
    let dotenv = dotenvy::dotenv();
    tracing_init("info").map_err(|source| MainError::TracingInit { source })?;

    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "ignoring unreadable .env file");
        }
    }

    let Config {
        database_url,
        credentials,
        repo_owner,
        repo_name,
        table,
    } = Config::from_env().map_err(|source| MainError::LoadConfig { source })?;

    // Dropped, and so released, on every early return below.
    let store =
        Store::connect(&database_url).map_err(|source| MainError::ConnectStore { source })?;

    let client = GitHubClient::authenticate(credentials)
        .map_err(|source| MainError::Authenticate { source })?;

    let target = IngestTarget {
        owner: &repo_owner,
        repo: &repo_name,
        table: &table,
    };

    let report = ingest_repo_watchers(&client, &store, &target).await;
    info!(?report, "ingest finished");

    store.close();
    Ok(())
}
