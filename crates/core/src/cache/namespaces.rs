//! Namespace lifecycle operations: open, list, delete.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// An opened namespace.
///
/// The row id pins the handle to one generation of the name: once the
/// namespace is deleted, writes through an old handle are rejected even if
/// the same name is opened again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceHandle {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl NamespaceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Size summary for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NamespaceStats {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

impl CacheDb {
    /// Open a namespace, creating it if absent.
    pub async fn open_namespace(&self, name: &str) -> Result<NamespaceHandle, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<NamespaceHandle, Error> {
                conn.execute(
                    "INSERT INTO namespaces (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![&name, chrono::Utc::now().to_rfc3339()],
                )?;
                let id: i64 = conn.query_row("SELECT id FROM namespaces WHERE name = ?1", params![&name], |row| {
                    row.get(0)
                })?;
                Ok(NamespaceHandle { id, name })
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all existing namespaces, sorted.
    pub async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts and body bytes per namespace, sorted by name.
    pub async fn namespace_stats(&self) -> Result<Vec<NamespaceStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<NamespaceStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT n.name, COUNT(e.cache_key), COALESCE(SUM(e.body_len), 0)
                     FROM namespaces n
                     LEFT JOIN entries e ON e.namespace_id = n.id
                     GROUP BY n.id
                     ORDER BY n.name",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(NamespaceStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and every entry in it.
    ///
    /// Returns false if the namespace did not exist.
    pub async fn delete_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
