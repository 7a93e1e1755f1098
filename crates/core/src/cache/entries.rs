//! Cached entry CRUD operations.
//!
//! Provides functions for reading, writing and deleting cached responses
//! inside an opened namespace.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::namespaces::NamespaceHandle;
use crate::Error;
use crate::request::{Request, Response, ResponseSource};
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{params, rusqlite::Connection};

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

impl CachedEntry {
    /// Capture a response for storage under `key`.
    pub fn from_response(key: &str, request: &Request, response: &Response) -> Self {
        Self {
            key: key.to_string(),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Replay the entry as a response served from cache.
    pub fn into_response(self) -> Response {
        Response {
            url: self.url,
            status: self.status,
            headers: self.headers,
            body: self.body.into(),
            source: ResponseSource::Cache,
        }
    }
}

impl CacheDb {
    /// Get an entry by key.
    ///
    /// Returns None on a miss.
    pub async fn get_entry(&self, handle: &NamespaceHandle, key: &str) -> Result<Option<CachedEntry>, Error> {
        let namespace_id = handle.id;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_key, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE namespace_id = ?1 AND cache_key = ?2",
                )?;

                let result = stmt.query_row(params![namespace_id, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                let (key, method, url, status, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::StorageUnavailable(format!("corrupt headers for {url}: {e}")))?;
                let status = u16::try_from(status)
                    .map_err(|_| Error::StorageUnavailable(format!("corrupt status {status} for {url}")))?;

                Ok(Some(CachedEntry { key, method, url, status, headers, body, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry.
    ///
    /// # Errors
    ///
    /// - `StorageQuotaExceeded` if the write would push stored bodies past the quota
    /// - `StorageUnavailable` if the namespace was deleted after `handle` was opened
    pub async fn put_entry(&self, handle: &NamespaceHandle, entry: &CachedEntry) -> Result<(), Error> {
        let namespace_id = handle.id;
        let entry = entry.clone();
        let quota = self.quota_bytes;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                check_quota(conn, quota, &[(namespace_id, &entry)])?;
                upsert(conn, namespace_id, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries across namespaces in one transaction.
    ///
    /// Either every entry is stored or none is.
    pub async fn put_entries(&self, batch: &[(NamespaceHandle, CachedEntry)]) -> Result<(), Error> {
        let batch: Vec<(i64, CachedEntry)> = batch.iter().map(|(h, e)| (h.id, e.clone())).collect();
        let quota = self.quota_bytes;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let refs: Vec<(i64, &CachedEntry)> = batch.iter().map(|(id, e)| (*id, e)).collect();
                check_quota(&tx, quota, &refs)?;
                for (namespace_id, entry) in &batch {
                    upsert(&tx, *namespace_id, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_entry(&self, handle: &NamespaceHandle, key: &str) -> Result<bool, Error> {
        let namespace_id = handle.id;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE namespace_id = ?1 AND cache_key = ?2",
                    params![namespace_id, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

fn upsert(conn: &Connection, namespace_id: i64, entry: &CachedEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.headers)
        .map_err(|e| Error::StorageUnavailable(format!("failed to encode headers: {e}")))?;
    conn.execute(
        "INSERT INTO entries (
            namespace_id, cache_key, method, url, status, headers_json, body, body_len, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(namespace_id, cache_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_len = excluded.body_len,
            stored_at = excluded.stored_at",
        params![
            namespace_id,
            &entry.key,
            &entry.method,
            &entry.url,
            entry.status as i64,
            headers_json,
            &entry.body,
            entry.body.len() as i64,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

/// Reject a write whose bodies would push the store past `quota`.
///
/// Bytes already stored under the same keys are replaced, so they are not
/// counted twice.
fn check_quota(conn: &Connection, quota: Option<u64>, batch: &[(i64, &CachedEntry)]) -> Result<(), Error> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let stored: i64 = conn.query_row("SELECT COALESCE(SUM(body_len), 0) FROM entries", [], |row| row.get(0))?;
    let mut replaced: i64 = 0;
    for (namespace_id, entry) in batch {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT body_len FROM entries WHERE namespace_id = ?1 AND cache_key = ?2",
                params![namespace_id, &entry.key],
                |row| row.get(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        replaced += existing.unwrap_or(0);
    }

    let incoming: u64 = batch.iter().map(|(_, e)| e.body.len() as u64).sum();
    let after = (stored - replaced).max(0) as u64 + incoming;
    if after > quota {
        return Err(Error::StorageQuotaExceeded(format!("{after} bytes exceeds quota of {quota}")));
    }
    Ok(())
}
