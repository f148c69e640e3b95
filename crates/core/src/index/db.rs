//! Database connection and operations.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use super::query::{Suggestions, build_match_query, prefix_upper_bound};
use super::schema::{SchemaError, drop_schema, init_schema};
use super::types::{IndexedItem, SearchOutcome, SearchResult};
use crate::descriptor::{ItemMetadata, SearchableText, WeightSlot, WorkDescriptor};

/// Relevance weight of each slot, `weight0` first.
pub const SLOT_WEIGHTS: [f64; 5] = [16.0, 8.0, 4.0, 2.0, 1.0];

/// Default number of suggestions returned per query.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Weighted full-text index plus its metadata table.
///
/// The connection sits behind a mutex so a store can be shared between the
/// job executor and search workers; every write happens in one transaction.
pub struct IndexStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    suggestion_limit: usize,
}

impl IndexStore {
    /// Open or create an index database at the given path.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        })
    }

    /// Set how many suggestions a query returns.
    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// Database file, if not in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the entry and metadata for one item.
    pub fn index_item(&self, item: &WorkDescriptor) -> Result<(), IndexError> {
        item.validate().map_err(|e| IndexError::InvalidData(e.to_string()))?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM search_index WHERE collection_id = ?1 AND item_id = ?2",
            params![item.collection_id, item.item_id],
        )?;

        tx.execute(
            "INSERT INTO search_index
                (collection_id, item_id, language, boost, weight0, weight1, weight2, weight3, weight4)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.collection_id,
                item.item_id,
                item.language,
                item.boost,
                item.text(WeightSlot::Weight0),
                item.text(WeightSlot::Weight1),
                item.text(WeightSlot::Weight2),
                item.text(WeightSlot::Weight3),
                item.text(WeightSlot::Weight4),
            ],
        )?;

        let meta = &item.metadata;
        tx.execute(
            "INSERT OR REPLACE INTO search_metadata
                (collection_id, item_id, title, subtitle, uri, display_type, image_uri)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.collection_id,
                item.item_id,
                meta.title,
                meta.subtitle,
                meta.uri,
                meta.display_type,
                meta.image_uri,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Delete the entry and metadata for one item.
    ///
    /// Removing an unknown item succeeds; the return value says whether
    /// anything was deleted.
    pub fn remove_item(&self, collection_id: &str, item_id: &str) -> Result<bool, IndexError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let index_rows = tx.execute(
            "DELETE FROM search_index WHERE collection_id = ?1 AND item_id = ?2",
            params![collection_id, item_id],
        )?;
        let meta_rows = tx.execute(
            "DELETE FROM search_metadata WHERE collection_id = ?1 AND item_id = ?2",
            params![collection_id, item_id],
        )?;

        tx.commit()?;
        Ok(index_rows + meta_rows > 0)
    }

    /// Drop and recreate all tables.
    pub fn reset(&self) -> Result<(), IndexError> {
        let conn = self.conn.lock();
        drop_schema(&conn)?;
        init_schema(&conn)?;
        Ok(())
    }

    /// Merge the FTS b-trees.
    pub fn optimize(&self) -> Result<(), IndexError> {
        let conn = self.conn.lock();
        conn.execute("INSERT INTO search_index(search_index) VALUES('optimize')", [])?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Ranked search across all weight slots.
    ///
    /// Results are ordered by descending score, ties by insertion order.
    /// A `limit` below 1 yields an empty outcome.
    pub fn search(&self, text: &str, limit: i64, offset: i64) -> Result<SearchOutcome, IndexError> {
        if limit < 1 {
            return Ok(SearchOutcome::empty());
        }
        let Some(query) = build_match_query(text) else {
            return Ok(SearchOutcome::empty());
        };

        let conn = self.conn.lock();

        let sql = format!(
            "SELECT search_index.collection_id, search_index.item_id, search_index.language,
                    m.title, m.subtitle, m.uri, m.display_type, m.image_uri,
                    -bm25(search_index, 0.0, 0.0, 0.0, 0.0, {}, {}, {}, {}, {})
                        * CAST(search_index.boost AS REAL) AS score
             FROM search_index
             LEFT JOIN search_metadata m
               ON m.collection_id = search_index.collection_id
              AND m.item_id = search_index.item_id
             WHERE search_index MATCH ?1
             ORDER BY score DESC, search_index.rowid ASC
             LIMIT ?2 OFFSET ?3",
            SLOT_WEIGHTS[0], SLOT_WEIGHTS[1], SLOT_WEIGHTS[2], SLOT_WEIGHTS[3], SLOT_WEIGHTS[4],
        );

        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![query.expression, limit, offset.max(0)], |row| {
                Ok(SearchResult {
                    collection_id: row.get(0)?,
                    item_id: row.get(1)?,
                    language: row.get(2)?,
                    title: row.get(3)?,
                    subtitle: row.get(4)?,
                    uri: row.get(5)?,
                    display_type: row.get(6)?,
                    image_uri: row.get(7)?,
                    score: row.get(8)?,
                    is_favorited: false,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let suggestions = Self::suggestions(&conn, &query.last_token, self.suggestion_limit)?;

        tracing::debug!("Query {:?} matched {} results", query.expression, results.len());
        Ok(SearchOutcome { results, suggestions })
    }

    fn suggestions(
        conn: &Connection,
        prefix: &str,
        limit: usize,
    ) -> Result<Suggestions, IndexError> {
        if limit == 0 || prefix.is_empty() {
            return Ok(Suggestions::empty());
        }

        let mut stmt = conn.prepare(
            "SELECT term FROM search_vocab
             WHERE term >= ?1 AND term < ?2 AND term <> ?1
             ORDER BY doc DESC, term ASC
             LIMIT ?3",
        )?;
        let terms = stmt
            .query_map(
                params![prefix, prefix_upper_bound(prefix), limit as i64],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Suggestions::new(terms))
    }

    /// Read an item back from both tables.
    pub fn get_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Option<IndexedItem>, IndexError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT s.language, CAST(s.boost AS REAL),
                    s.weight0, s.weight1, s.weight2, s.weight3, s.weight4,
                    m.title, m.subtitle, m.uri, m.display_type, m.image_uri
             FROM search_index s
             LEFT JOIN search_metadata m
               ON m.collection_id = s.collection_id AND m.item_id = s.item_id
             WHERE s.collection_id = ?1 AND s.item_id = ?2",
            params![collection_id, item_id],
            |row| {
                let mut searchable_text = SearchableText::new();
                for slot in WeightSlot::ALL {
                    let text: Option<String> = row.get(2 + slot.index())?;
                    if let Some(text) = text {
                        searchable_text.insert(slot, text);
                    }
                }
                Ok(IndexedItem {
                    collection_id: collection_id.to_string(),
                    item_id: item_id.to_string(),
                    language: row.get(0)?,
                    boost: row.get(1)?,
                    searchable_text,
                    metadata: ItemMetadata {
                        title: row.get(7)?,
                        subtitle: row.get(8)?,
                        uri: row.get(9)?,
                        display_type: row.get(10)?,
                        image_uri: row.get(11)?,
                    },
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Number of rows in the index table.
    pub fn count_items(&self) -> Result<i64, IndexError> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM search_index", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of rows in the metadata table.
    pub fn count_metadata(&self) -> Result<i64, IndexError> {
        let conn = self.conn.lock();
        let count =
            conn.query_row("SELECT COUNT(*) FROM search_metadata", [], |row| row.get(0))?;
        Ok(count)
    }
}
