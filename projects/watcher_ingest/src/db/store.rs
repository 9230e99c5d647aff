use std::time::Duration;

use async_trait::async_trait;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::db::{
    profile::queries::{insert_record, InsertRecordError},
    PgPool,
};
use crate::ingest::ProfileStore;

/// Bound on opening the connection and on waiting for it in `insert`.
const CONNECTION_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Error)]
pub enum ConnectStoreError {
    #[error("BuildPool: {source}")]
    BuildPool {
        #[from]
        source: r2d2::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreInsertError {
    #[error("GetConnectionFromPool: {source}")]
    GetConnectionFromPool { source: r2d2::Error },

    #[error(transparent)]
    InsertRecord {
        #[from]
        source: InsertRecordError,
    },

    #[error("BlockingTask: {source}")]
    BlockingTask { source: tokio::task::JoinError },
}

/// The single database connection used for the whole run.
///
/// Released by `close`, or on drop along any early-exit path.
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Opens the connection up front; an unreachable database is an error here
    /// rather than on the first insert.
    pub fn connect(database_url: &str) -> Result<Self, ConnectStoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|source| ConnectStoreError::BuildPool { source })?;

        info!("database connection established");
        Ok(Self { pool })
    }

    pub fn close(self) {
        drop(self.pool);
        info!("database connection closed");
    }
}

#[async_trait]
impl ProfileStore for Store {
    type Error = StoreInsertError;

    async fn insert(&self, table: &str, record: Map<String, Value>) -> Result<usize, Self::Error> {
        let pool = self.pool.clone();
        let table = table.to_string();

        tokio::task::spawn_blocking(move || -> Result<usize, StoreInsertError> {
            let mut conn = pool
                .get()
                .map_err(|source| StoreInsertError::GetConnectionFromPool { source })?;
            Ok(insert_record(&mut conn, &table, record)?)
        })
        .await
        .map_err(|source| StoreInsertError::BlockingTask { source })?
    }
}
