//! SQLite schema definition and migrations.

use rusqlite::Connection;
use thiserror::Error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Weighted full-text table.
pub const INDEX_TABLE: &str = "search_index";
/// Display metadata, keyed like the index table.
pub const METADATA_TABLE: &str = "search_metadata";
/// Term vocabulary over the index table (for suggestions).
pub const VOCAB_TABLE: &str = "search_vocab";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Initialize or migrate the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    } else if version > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Drop every table, leaving an empty database.
pub fn drop_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS search_vocab;
        DROP TABLE IF EXISTS search_index;
        DROP TABLE IF EXISTS search_metadata;
        DROP TABLE IF EXISTS schema_version;
        "#,
    )?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Weighted index: key columns are stored but not tokenized,
        -- weight0 is the most relevant slot, weight4 the least.
        CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
            collection_id UNINDEXED,
            item_id UNINDEXED,
            language UNINDEXED,
            boost UNINDEXED,
            weight0,
            weight1,
            weight2,
            weight3,
            weight4
        );

        -- Display metadata, one row per indexed item
        CREATE TABLE IF NOT EXISTS search_metadata (
            collection_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            title TEXT,
            subtitle TEXT,
            uri TEXT,
            display_type TEXT,
            image_uri TEXT,
            PRIMARY KEY (collection_id, item_id)
        );

        -- Per-term document counts, used for suggestions
        CREATE VIRTUAL TABLE IF NOT EXISTS search_vocab USING fts5vocab(search_index, 'row');
        "#,
    )?;

    Ok(())
}

fn migrate(_conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    // Only v1 exists so far.
    Err(SchemaError::MigrationFailed(format!(
        "No migration path from version {} to {}",
        from_version, SCHEMA_VERSION
    )))
}
