//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Get current version
    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Apply migrations
    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, quill_core::now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One encryption key per collection id
        CREATE TABLE collection_keys (
            collection_id TEXT PRIMARY KEY,
            key BLOB NOT NULL,                -- 32 bytes
            created_at INTEGER NOT NULL       -- Unix ms
        );

        -- Collection records
        CREATE TABLE collections (
            collection_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            approval_status INTEGER NOT NULL, -- ApprovalStatus as u8
            is_encrypted INTEGER NOT NULL,
            owner INTEGER NOT NULL,           -- CollectionOwner as u8
            publish_date INTEGER,             -- Unix ms, nullable
            in_progress BLOB NOT NULL,        -- CBOR array of URIs
            complete BLOB NOT NULL,           -- CBOR array of URIs
            reviewed BLOB NOT NULL,           -- CBOR array of URIs
            updated_at INTEGER NOT NULL
        );

        -- Indexes for startup reconciliation queries
        CREATE INDEX idx_collections_publish_date ON collections(publish_date);
        CREATE INDEX idx_collections_approval ON collections(approval_status);
        "#,
    )?;

    Ok(())
}
