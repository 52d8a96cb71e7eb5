//! Database façade: the entry point applications open, owning the set of
//! tables living under one root directory and opening each lazily on first
//! access.
//!
//! Grounded on `original_source/QuixDB.py`'s `QuixDB` class, with one
//! deliberate deviation: the Python source returns the same instance for a
//! given folder path every time via `__new__`, a singleton that exists to
//! avoid two in-process handles fighting over the same file descriptors.
//! This crate's locking is already safe under concurrent in-process access
//! (`TableLock`), so `Database` is a plain value the caller owns — opening
//! the same directory twice yields two independent handles, each observing
//! the same on-disk state through its own lazily-opened `Table`s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{CResult, Error};
use crate::schema::{Column, Schema};
use crate::table::{self, Table};
use crate::value::NamedRow;

pub struct Database {
    dir: PathBuf,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    /// Opens `dir` as a database root, creating it if it does not exist.
    /// Table subdirectories already present are not opened eagerly; each
    /// opens lazily on first access.
    pub fn open(dir: impl AsRef<Path>) -> CResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Database { dir, tables: RwLock::new(HashMap::new()) })
    }

    /// Declares `name` with the given columns. Idempotent: if the table
    /// already exists with the same schema this is a no-op; if it exists
    /// with a different one, fails with `SchemaConflict`.
    pub fn create_table(&self, name: &str, columns: Vec<Column>) -> CResult<()> {
        let schema = Schema::new(columns);
        let table = Table::create(&self.table_dir(name), schema)?;
        self.tables.write().expect("table registry poisoned").insert(name.to_string(), Arc::new(table));
        Ok(())
    }

    pub fn insert(&self, table_name: &str, row: NamedRow) -> CResult<()> {
        self.table(table_name)?.insert(row)
    }

    pub fn bulk_insert(&self, table_name: &str, rows: Vec<NamedRow>) -> CResult<Vec<CResult<()>>> {
        Ok(self.table(table_name)?.bulk_insert(rows))
    }

    pub fn select(&self, table_name: &str, where_: &NamedRow) -> CResult<Option<NamedRow>> {
        self.table(table_name)?.select(where_)
    }

    pub fn update(&self, table_name: &str, where_: &NamedRow, changes: &NamedRow) -> CResult<()> {
        self.table(table_name)?.update(where_, changes)
    }

    pub fn delete(&self, table_name: &str, where_: &NamedRow) -> CResult<()> {
        self.table(table_name)?.delete(where_)
    }

    pub fn compact(&self, table_name: &str) -> CResult<()> {
        self.table(table_name)?.compact()
    }

    /// The declared schema for `table_name`, for callers (such as the CLI)
    /// that need to type a row before encoding it.
    pub fn schema_of(&self, table_name: &str) -> CResult<Schema> {
        Ok(self.table(table_name)?.schema().clone())
    }

    fn table_dir(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Returns the named table's handle, opening it from disk on first
    /// access if it isn't already resident.
    fn table(&self, name: &str) -> CResult<Arc<Table>> {
        if let Some(table) = self.tables.read().expect("table registry poisoned").get(name) {
            return Ok(table.clone());
        }

        let dir = self.table_dir(name);
        if !dir.join(table::SCHEMA_FILE).exists() {
            return Err(Error::SchemaViolation(format!("no such table '{name}'")));
        }

        let mut tables = self.tables.write().expect("table registry poisoned");
        if let Some(table) = tables.get(name) {
            return Ok(table.clone());
        }
        let opened = Arc::new(Table::open(&dir)?);
        tables.insert(name.to_string(), opened.clone());
        Ok(opened)
    }
}
