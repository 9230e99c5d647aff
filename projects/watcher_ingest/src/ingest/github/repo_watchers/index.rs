use futures::future::join_all;
use tracing::{debug, error, info};

use crate::ingest::{ProfileStore, WatcherDirectory};

/// Index of the last watcher page fetched; pages 0 and 1 are ingested.
pub const LAST_PAGE: u32 = 1;

#[derive(Debug, Clone)]
pub struct IngestTarget<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub table: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages_fetched: u32,
    pub watchers_seen: usize,
    pub profiles_persisted: usize,
    pub profile_failures: usize,
    pub insert_failures: usize,
    /// Page whose watcher listing failed and stopped the run.
    pub aborted_at_page: Option<u32>,
}

enum WatcherOutcome {
    Persisted,
    ProfileFailed,
    InsertFailed,
}

/// Walks watcher pages `0..=LAST_PAGE`, persisting each watcher's profile
/// (without its meta field) into `target.table`.
///
/// Profiles of one page are fetched and stored concurrently and the next page
/// is requested once all of them have settled. A failed watcher listing ends
/// the run; a failed profile fetch or insert only skips that watcher. Nothing
/// is retried and every failure is logged, never returned.
pub async fn ingest_repo_watchers<D, S>(
    directory: &D,
    store: &S,
    target: &IngestTarget<'_>,
) -> IngestReport
where
    D: WatcherDirectory,
    S: ProfileStore,
{
    let mut report = IngestReport::default();

    for page in 0..=LAST_PAGE {
        info!(owner = target.owner, repo = target.repo, page, "fetching watchers");

        let watchers = match directory.watchers(target.owner, target.repo, page).await {
            Ok(watchers) => watchers,
            Err(err) => {
                error!(page, error = %err, "fetching watchers failed");
                report.aborted_at_page = Some(page);
                break;
            }
        };

        report.pages_fetched += 1;
        report.watchers_seen += watchers.len();

        let outcomes = join_all(
            watchers
                .iter()
                .map(|watcher| persist_watcher(directory, store, target.table, &watcher.login)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                WatcherOutcome::Persisted => report.profiles_persisted += 1,
                WatcherOutcome::ProfileFailed => report.profile_failures += 1,
                WatcherOutcome::InsertFailed => report.insert_failures += 1,
            }
        }
    }

    report
}

async fn persist_watcher<D, S>(directory: &D, store: &S, table: &str, login: &str) -> WatcherOutcome
where
    D: WatcherDirectory,
    S: ProfileStore,
{
    let mut profile = match directory.user_profile(login).await {
        Ok(profile) => profile,
        Err(err) => {
            error!(login, error = %err, "fetching profile failed");
            return WatcherOutcome::ProfileFailed;
        }
    };

    if let Some(meta) = profile.strip_meta() {
        debug!(login, %meta, "stripped response meta");
    }

    match store.insert(table, profile.into_fields()).await {
        Ok(rows) => {
            info!(login, table, rows, "profile persisted");
            WatcherOutcome::Persisted
        }
        Err(err) => {
            error!(login, table, error = %err, "persisting profile failed");
            WatcherOutcome::InsertFailed
        }
    }
}
