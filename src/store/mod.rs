//!
//! lobbyd storage module
//! ---------------------
//! Embedded relational store backing the credential catalog, the user catalog
//! and the application entities. Each logical table (named like
//! `security.tokens` or `app.lobbies`) is a vector of JSON-object rows kept
//! in memory behind a `parking_lot` lock and snapshotted to one JSON file per
//! table under a configured root folder.
//!
//! Key responsibilities:
//! - Whole-table scans feeding the filtered-query engine.
//! - Single-statement mutations (`insert`, `update_where`, `delete_where`);
//!   each acquires the write lock once, so a mutation is never observed
//!   half-applied.
//! - Snapshot persistence and reload across restarts.
//!
//! The `Store` handle is cheap to clone and shared across the server state,
//! the token manager and the query engine.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

/// A single logical row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(serde::Serialize, serde::Deserialize)]
struct TableSnapshot {
    table: String,
    rows: Vec<Row>,
}

/// Shared handle to the embedded store.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl Store {
    /// Open a store rooted at the given folder, loading any table snapshots
    /// found there. The directory is created if it does not already exist.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating store root {}", root.display()))?;
        let mut tables: HashMap<String, Vec<Row>> = HashMap::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let snap: TableSnapshot = serde_json::from_str(&text)
                .with_context(|| format!("parsing snapshot {}", path.display()))?;
            debug!(target: "lobbyd::store", "loaded table '{}' ({} rows)", snap.table, snap.rows.len());
            tables.insert(snap.table, snap.rows);
        }
        Ok(Self { root, tables: Arc::new(RwLock::new(tables)) })
    }

    pub fn root_path(&self) -> &PathBuf { &self.root }

    /// Ensure a table exists (idempotent) and snapshot it.
    pub fn create_table(&self, table: &str) -> Result<()> {
        let rows = {
            let mut map = self.tables.write();
            map.entry(table.to_string()).or_default();
            map.get(table).cloned().unwrap_or_default()
        };
        self.persist_table(table, &rows)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Append one row. Creates the table on first insert.
    pub fn insert(&self, table: &str, row: Row) -> Result<()> {
        let rows = {
            let mut map = self.tables.write();
            let rows = map.entry(table.to_string()).or_default();
            rows.push(row);
            rows.clone()
        };
        self.persist_table(table, &rows)
    }

    /// Clone out all rows of a table. A missing table scans as empty rather
    /// than erroring, matching the catalog-read behavior callers expect.
    pub fn scan(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.tables.read().get(table).cloned().unwrap_or_default())
    }

    /// Apply `apply` to every row matching `pred`; returns how many matched.
    pub fn update_where<P, F>(&self, table: &str, pred: P, apply: F) -> Result<usize>
    where
        P: Fn(&Row) -> bool,
        F: Fn(&mut Row),
    {
        let (count, rows) = {
            let mut map = self.tables.write();
            let rows = map.entry(table.to_string()).or_default();
            let mut count = 0usize;
            for row in rows.iter_mut() {
                if pred(row) {
                    apply(row);
                    count += 1;
                }
            }
            (count, rows.clone())
        };
        if count > 0 { self.persist_table(table, &rows)?; }
        Ok(count)
    }

    /// Remove every row matching `pred`; returns how many were removed.
    pub fn delete_where<P>(&self, table: &str, pred: P) -> Result<usize>
    where
        P: Fn(&Row) -> bool,
    {
        let (removed, rows) = {
            let mut map = self.tables.write();
            let rows = map.entry(table.to_string()).or_default();
            let before = rows.len();
            rows.retain(|r| !pred(r));
            (before - rows.len(), rows.clone())
        };
        if removed > 0 { self.persist_table(table, &rows)?; }
        Ok(removed)
    }

    fn snapshot_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_filename(table)))
    }

    fn persist_table(&self, table: &str, rows: &[Row]) -> Result<()> {
        let snap = TableSnapshot { table: table.to_string(), rows: rows.to_vec() };
        let text = serde_json::to_string(&snap)?;
        let path = self.snapshot_path(table);
        fs::write(&path, text)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        Ok(())
    }
}
