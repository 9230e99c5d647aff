//! GitHub repository watcher ingestion
//!
//! - Watcher and profile fetching through `interfaces_github_watchers`
//! - PostgreSQL persistence in `db/`
//! - The fetch-and-store loop in `ingest/`
//! - Requires DATABASE_URL and GitHub credentials, see `config`

pub mod config;
pub mod db;
pub mod ingest;
