//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for Quill. It uses rusqlite with
//! bundled SQLite behind a mutex-guarded connection.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use quill_core::{
    ApprovalStatus, Collection, CollectionId, CollectionKey, CollectionOwner, ContentUri,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{CollectionStore, KeyStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened quill store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }
}

// Helper to encode a URI tree to CBOR
fn encode_tree(tree: &BTreeSet<ContentUri>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(tree, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

// Helper to decode a URI tree from CBOR
fn decode_tree(bytes: &[u8]) -> Result<BTreeSet<ContentUri>> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// Helper to convert a row to Collection
fn row_to_collection(row: &rusqlite::Row<'_>) -> Result<Collection> {
    let approval: u8 = row
        .get("approval_status")
        .map_err(StoreError::Database)?;
    let owner: u8 = row.get("owner").map_err(StoreError::Database)?;
    let in_progress: Vec<u8> = row.get("in_progress").map_err(StoreError::Database)?;
    let complete: Vec<u8> = row.get("complete").map_err(StoreError::Database)?;
    let reviewed: Vec<u8> = row.get("reviewed").map_err(StoreError::Database)?;

    Ok(Collection {
        id: CollectionId::new(
            row.get::<_, String>("collection_id")
                .map_err(StoreError::Database)?,
        ),
        name: row.get("name").map_err(StoreError::Database)?,
        approval_status: ApprovalStatus::from_u8(approval)
            .ok_or_else(|| StoreError::InvalidData(format!("approval status {}", approval)))?,
        is_encrypted: row.get("is_encrypted").map_err(StoreError::Database)?,
        owner: CollectionOwner::from_u8(owner)
            .ok_or_else(|| StoreError::InvalidData(format!("collection owner {}", owner)))?,
        in_progress: decode_tree(&in_progress)?,
        complete: decode_tree(&complete)?,
        reviewed: decode_tree(&reviewed)?,
        publish_date: row.get("publish_date").map_err(StoreError::Database)?,
    })
}

#[async_trait]
impl KeyStore for SqliteStore {
    async fn get(&self, id: &CollectionId) -> Result<Option<CollectionKey>> {
        self.with_conn(|conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT key FROM collection_keys WHERE collection_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            match bytes {
                Some(b) => {
                    let key = CollectionKey::from_slice(&b)
                        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                    Ok(Some(key))
                }
                None => Ok(None),
            }
        })
    }

    async fn put(&self, id: &CollectionId, key: &CollectionKey) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collection_keys (collection_id, key, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(collection_id) DO UPDATE SET key = excluded.key",
                params![id.as_str(), key.as_bytes().as_slice(), quill_core::now_millis()],
            )?;
            Ok(())
        })
    }

    async fn delete(&self, id: &CollectionId) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM collection_keys WHERE collection_id = ?1",
                params![id.as_str()],
            )?;
            Ok(affected > 0)
        })
    }

    async fn read_all(&self) -> Result<HashMap<CollectionId, CollectionKey>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT collection_id, key FROM collection_keys")?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((id, bytes))
            })?;

            let mut keys = HashMap::new();
            for row in rows {
                let (id, bytes) = row?;
                let key = CollectionKey::from_slice(&bytes)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                keys.insert(CollectionId::new(id), key);
            }
            Ok(keys)
        })
    }
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn upsert(&self, collection: &Collection) -> Result<()> {
        let in_progress = encode_tree(&collection.in_progress)?;
        let complete = encode_tree(&collection.complete)?;
        let reviewed = encode_tree(&collection.reviewed)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (collection_id, name, approval_status, is_encrypted,
                                          owner, publish_date, in_progress, complete, reviewed,
                                          updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(collection_id) DO UPDATE SET
                     name = excluded.name,
                     approval_status = excluded.approval_status,
                     is_encrypted = excluded.is_encrypted,
                     owner = excluded.owner,
                     publish_date = excluded.publish_date,
                     in_progress = excluded.in_progress,
                     complete = excluded.complete,
                     reviewed = excluded.reviewed,
                     updated_at = excluded.updated_at",
                params![
                    collection.id.as_str(),
                    collection.name,
                    collection.approval_status.as_u8(),
                    collection.is_encrypted,
                    collection.owner.as_u8(),
                    collection.publish_date,
                    in_progress,
                    complete,
                    reviewed,
                    quill_core::now_millis(),
                ],
            )?;
            Ok(())
        })
    }

    async fn get(&self, id: &CollectionId) -> Result<Option<Collection>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM collections WHERE collection_id = ?1")?;
            let mut rows = stmt.query(params![id.as_str()])?;

            match rows.next()? {
                Some(row) => Ok(Some(row_to_collection(row)?)),
                None => Ok(None),
            }
        })
    }

    async fn delete(&self, id: &CollectionId) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM collections WHERE collection_id = ?1",
                params![id.as_str()],
            )?;
            Ok(affected > 0)
        })
    }

    async fn list(&self) -> Result<Vec<Collection>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM collections ORDER BY collection_id")?;
            let mut rows = stmt.query([])?;

            let mut collections = Vec::new();
            while let Some(row) = rows.next()? {
                collections.push(row_to_collection(row)?);
            }
            Ok(collections)
        })
    }
}
