use diesel::{prelude::*, sql_types::Jsonb};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InsertRecordError {
    #[error("EmptyRecord: nothing to insert into {table}")]
    EmptyRecord { table: String },

    #[error("InvalidIdentifier: {identifier:?}")]
    InvalidIdentifier { identifier: String },

    #[error("InsertRecord: {source}")]
    InsertRecord {
        #[from]
        source: diesel::result::Error,
    },
}

/// Inserts `record` as one row of `table`, one column per key.
///
/// Values travel as a single jsonb parameter and are cast to the column
/// types by `jsonb_populate_record`, so a key without a matching column fails
/// the whole insert.
pub fn insert_record(
    conn: &mut PgConnection,
    table: &str,
    record: Map<String, Value>,
) -> Result<usize, InsertRecordError> {
    let sql = build_insert_sql(table, record.keys().map(String::as_str))?;
    debug!(%sql, "insert record");

    diesel::sql_query(sql)
        .bind::<Jsonb, _>(Value::Object(record))
        .execute(conn)
        .map_err(|source| InsertRecordError::InsertRecord { source })
}

pub fn build_insert_sql<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<String, InsertRecordError> {
    let table_ident = quote_identifier(table)?;
    let columns = columns
        .into_iter()
        .map(quote_identifier)
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(InsertRecordError::EmptyRecord {
            table: table.to_string(),
        });
    }

    let columns = columns.join(", ");
    Ok(format!(
        "INSERT INTO {table_ident} ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table_ident}, $1)"
    ))
}

pub fn quote_identifier(identifier: &str) -> Result<String, InsertRecordError> {
    if identifier.is_empty() || identifier.contains('\0') {
        return Err(InsertRecordError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
}
