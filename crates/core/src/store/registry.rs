//! Store registry CRUD operations.
//!
//! The registry is the exclusive owner of all named stores. Writes to the
//! same key under concurrent calls resolve last-write-wins; a record is
//! replaced atomically as a whole.

use super::connection::StoreDb;
use super::record::ResponseRecord;
use crate::generation::{Generation, StoreClass};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Versioned namespace-to-blob-store mapping.
///
/// All operations are safe to call concurrently from multiple in-flight
/// strategy executions.
#[derive(Clone, Debug)]
pub struct StoreRegistry {
    db: StoreDb,
    generation: Generation,
}

impl StoreRegistry {
    pub fn new(db: StoreDb, generation: Generation) -> Self {
        Self { db, generation }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Store name for a content class under the current generation.
    ///
    /// Idempotent: stores materialize on first write, so "opening" is just
    /// name derivation.
    pub fn open(&self, class: StoreClass) -> String {
        self.generation.store_name(class)
    }

    /// Get a record by store name and request key.
    ///
    /// Returns None on a miss.
    pub async fn get(&self, store: &str, key: &str) -> Result<Option<ResponseRecord>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<ResponseRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, stored_at
                     FROM records WHERE store = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                match result {
                    Ok((status, headers_json, body, stored_at)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptRecord(format!("headers: {e}")))?;
                        Ok(Some(ResponseRecord { status: status as u16, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the record for a key.
    ///
    /// UPSERT semantics: total replacement, never partial. Rejects any
    /// record whose status is outside the success range; failed and
    /// redirect responses must never be present in a store.
    pub async fn put(&self, store: &str, key: &str, record: &ResponseRecord) -> Result<(), Error> {
        if !record.is_success() {
            return Err(Error::NotCacheable(record.status));
        }

        let store = store.to_string();
        let key = key.to_string();
        let record = record.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let headers_json = serde_json::to_string(&record.headers)
                    .map_err(|e| Error::CorruptRecord(format!("headers encode: {e}")))?;
                conn.execute(
                    "INSERT INTO records (store, key, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(store, key) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        store,
                        key,
                        record.status as i64,
                        headers_json,
                        record.body,
                        record.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a named store and everything in it.
    ///
    /// Returns the number of deleted records.
    pub async fn delete_store(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM records WHERE store = ?1", params![store])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every store currently holding records, across generations.
    pub async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT store FROM records ORDER BY store")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop every record in every store.
    ///
    /// Control-channel "clear all stores". Returns the number of deleted
    /// records.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        self.db
            .conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM records", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of records in a store.
    pub async fn count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM records WHERE store = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Trim the oldest entries of a store until count <= max_entries.
    ///
    /// Insertion recency (`stored_at`) is the eviction order. Returns the
    /// number of deleted records.
    pub async fn trim_store(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM records WHERE store = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM records WHERE store = ?1 AND key IN (
                        SELECT key FROM records WHERE store = ?1
                        ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
