//! Table Engine (spec §4.5): ties the row codec, log, primary index and
//! lock manager together into the operations an application calls.
//!
//! Grounded on the teacher's `kv::storage::engine`, which opens a `Log`,
//! rebuilds its index with a single scan, and serializes access through a
//! lock acquired once per call. Here the table is `Sync` via interior
//! mutability (`Mutex<Log>` for the write path, `RwLock<Index>` for the
//! index, fresh read-only file handles for lookups) so that readers in the
//! same process genuinely run concurrently with each other, matching the
//! shared/exclusive distinction in the lock manager.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::codec;
use crate::error::{CResult, Error};
use crate::index::{self, Index, IndexEntry};
use crate::lock::TableLock;
use crate::log::{self as rowlog, Log};
use crate::schema::Schema;
use crate::value::NamedRow;

pub(crate) const DATA_FILE: &str = "data.dat";
pub(crate) const SCHEMA_FILE: &str = "schema.bin";
const LOCK_FILE: &str = ".lock";

/// A single table: one schema, one append-only log, one primary index, all
/// living under `dir`.
pub struct Table {
    schema: Schema,
    dir: PathBuf,
    data_path: PathBuf,
    lock: TableLock,
    log: Mutex<Log>,
    index: RwLock<Index>,
}

impl Table {
    /// Opens the table at `dir` if `schema.bin` already exists and is
    /// compatible with `schema`; otherwise creates it. Idempotent re-creation
    /// with a mismatched schema is a `SchemaConflict`.
    pub fn create(dir: &Path, schema: Schema) -> CResult<Self> {
        std::fs::create_dir_all(dir)?;
        let schema_path = dir.join(SCHEMA_FILE);
        if schema_path.exists() {
            let existing = Schema::read(&schema_path)?;
            if !existing.compatible_with(&schema) {
                return Err(Error::SchemaConflict(format!(
                    "table at {} already exists with a different schema",
                    dir.display()
                )));
            }
        } else {
            schema.write_atomic(&schema_path)?;
        }
        Self::open(dir)
    }

    /// Opens an existing table directory, recovering from a torn tail left
    /// by a crash mid-append before rebuilding the index.
    pub fn open(dir: &Path) -> CResult<Self> {
        let schema = Schema::read(&dir.join(SCHEMA_FILE))?;
        let data_path = dir.join(DATA_FILE);
        let mut log = Log::open(&data_path)?;

        let (frames, clean_len) = log.scan()?;
        let file_len = log.len()?;
        if clean_len < file_len {
            ::log::warn!(
                "table at {}: discarding {} torn bytes past offset {}",
                dir.display(),
                file_len - clean_len,
                clean_len
            );
            log.truncate_to(clean_len)?;
        }

        let index = index::build(&frames, &schema)?;
        let lock = TableLock::open(&dir.join(LOCK_FILE))?;
        Ok(Table {
            schema,
            dir: dir.to_path_buf(),
            data_path,
            lock,
            log: Mutex::new(log),
            index: RwLock::new(index),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn validate_known_columns(&self, row: &NamedRow) -> CResult<()> {
        for key in row.keys() {
            if self.schema.column_index(key).is_none() {
                return Err(Error::SchemaViolation(format!("unknown column '{key}'")));
            }
        }
        Ok(())
    }

    /// Validates `row` against the schema, checks for a duplicate unique
    /// key, appends, then updates the index — in that order, under the
    /// table's exclusive lock (spec §4.5 "insert").
    pub fn insert(&self, row: NamedRow) -> CResult<()> {
        let frame = codec::encode(&self.schema, &row)?;
        let key =
            if self.schema.has_unique_key() { Some(codec::encode_key(&self.schema, &row)?) } else { None };

        let _guard = self.lock.write()?;

        if let Some(key) = &key {
            let existing_alive =
                self.index.read().expect("index lock poisoned").get(key).is_some_and(|e| e.alive);
            if existing_alive {
                return Err(Error::DuplicateKey("unique key already present".into()));
            }
        }

        let offset = {
            let mut log = self.log.lock().expect("log lock poisoned");
            log.append(&frame)?
        };

        if let Some(key) = key {
            let length = frame.len() as u32;
            self.index.write().expect("index lock poisoned").insert(
                key,
                IndexEntry { offset, length, alive: true },
            );
        }
        Ok(())
    }

    /// Inserts each row independently, collecting one result per row rather
    /// than aborting the batch on the first failure — a row that violates
    /// the schema or a uniqueness constraint does not prevent the rows
    /// around it from being committed.
    pub fn bulk_insert(&self, rows: Vec<NamedRow>) -> Vec<CResult<()>> {
        rows.into_iter().map(|row| self.insert(row)).collect()
    }

    /// Returns the first row matching every clause in `where_`, or `None`.
    pub fn select(&self, where_: &NamedRow) -> CResult<Option<NamedRow>> {
        self.validate_known_columns(where_)?;
        let _guard = self.lock.read()?;
        Ok(self.locate(where_)?.map(|(_, row)| row))
    }

    /// Locates the row matching `where_`, merges `changes` into it, appends
    /// the merged row, then tombstones the old frame — append-before-
    /// tombstone, so a crash between the two leaves the old row intact and
    /// the new one either absent or a second live candidate the index
    /// rebuild on next open resolves by offset order (spec §4.4, §4.5).
    pub fn update(&self, where_: &NamedRow, changes: &NamedRow) -> CResult<()> {
        self.validate_known_columns(where_)?;
        self.validate_known_columns(changes)?;

        let _guard = self.lock.write()?;

        let (old_offset, old_row) = self.locate(where_)?.ok_or(Error::NotFound)?;

        let mut new_row = old_row.clone();
        for (k, v) in changes {
            new_row.insert(k.clone(), v.clone());
        }

        let has_unique = self.schema.has_unique_key();
        let old_key = has_unique.then(|| codec::encode_key(&self.schema, &old_row)).transpose()?;
        let new_key = has_unique.then(|| codec::encode_key(&self.schema, &new_row)).transpose()?;

        if let Some(new_key) = &new_key {
            if old_key.as_ref() != Some(new_key) {
                let renamed_alive =
                    self.index.read().expect("index lock poisoned").get(new_key).is_some_and(|e| e.alive);
                if renamed_alive {
                    return Err(Error::DuplicateKey("unique key already present".into()));
                }
            }
        }

        let frame = codec::encode(&self.schema, &new_row)?;
        let new_offset = {
            let mut log = self.log.lock().expect("log lock poisoned");
            let new_offset = log.append(&frame)?;
            log.mark_deleted(old_offset)?;
            new_offset
        };

        if let Some(new_key) = new_key {
            let mut index = self.index.write().expect("index lock poisoned");
            if let Some(old_key) = &old_key {
                if old_key != &new_key {
                    if let Some(old_entry) = index.get_mut(old_key) {
                        if old_entry.offset == old_offset {
                            old_entry.alive = false;
                        }
                    }
                }
            }
            let length = frame.len() as u32;
            index.insert(new_key, IndexEntry { offset: new_offset, length, alive: true });
        }

        Ok(())
    }

    /// Locates the row matching `where_` and tombstones its frame.
    pub fn delete(&self, where_: &NamedRow) -> CResult<()> {
        self.validate_known_columns(where_)?;

        let _guard = self.lock.write()?;

        let (offset, row) = self.locate(where_)?.ok_or(Error::NotFound)?;

        {
            let mut log = self.log.lock().expect("log lock poisoned");
            log.mark_deleted(offset)?;
        }

        if self.schema.has_unique_key() {
            let key = codec::encode_key(&self.schema, &row)?;
            let mut index = self.index.write().expect("index lock poisoned");
            if let Some(entry) = index.get_mut(&key) {
                if entry.offset == offset {
                    entry.alive = false;
                }
            }
        }
        Ok(())
    }

    /// Rewrites the log with only its currently-live frames, discarding
    /// tombstoned and superseded entries, then rebuilds the index against
    /// fresh offsets. The new log is built in a temporary file next to the
    /// original and swapped in by rename, so a crash mid-compaction leaves
    /// the original log untouched (spec §6 "Atomic writes").
    pub fn compact(&self) -> CResult<()> {
        let _guard = self.lock.write()?;

        let mut log = self.log.lock().expect("log lock poisoned");
        let (frames, clean_len) = log.scan()?;
        let file_len = log.len()?;
        if clean_len < file_len {
            log.truncate_to(clean_len)?;
        }

        let mut index = self.index.write().expect("index lock poisoned");
        let has_unique = self.schema.has_unique_key();
        let mut live_rows = Vec::new();
        for frame in &frames {
            if frame.tombstone != 0 {
                continue;
            }
            let row = codec::decode_payload(&frame.payload, &self.schema)?;
            if has_unique {
                let key = codec::encode_key(&self.schema, &row)?;
                match index.get(&key) {
                    Some(entry) if entry.alive && entry.offset == frame.offset => {}
                    _ => continue,
                }
            }
            live_rows.push(row);
        }

        let tmp_path = self.dir.join(".data.dat.compact");
        let mut new_index = Index::new();
        {
            let mut tmp_log = Log::open(&tmp_path)?;
            for row in &live_rows {
                let frame = codec::encode(&self.schema, row)?;
                let offset = tmp_log.append(&frame)?;
                if has_unique {
                    let key = codec::encode_key(&self.schema, row)?;
                    new_index.insert(key, IndexEntry { offset, length: frame.len() as u32, alive: true });
                }
            }
        }
        std::fs::rename(&tmp_path, &self.data_path)?;
        if let Ok(dir_handle) = File::open(&self.dir) {
            let _ = dir_handle.sync_all();
        }

        *log = Log::open(&self.data_path)?;
        *index = new_index;
        Ok(())
    }

    /// Finds the row matching every clause in `where_`, alongside its frame
    /// offset. Takes the index fast path when `where_` pins every unique
    /// column; otherwise scans the whole log in write order and returns the
    /// first live frame that matches (spec §4.5 "select").
    fn locate(&self, where_: &NamedRow) -> CResult<Option<(u64, NamedRow)>> {
        if self.schema.has_unique_key() && self.covers_unique_key(where_) {
            self.locate_by_index(where_)
        } else {
            self.locate_by_scan(where_)
        }
    }

    fn covers_unique_key(&self, where_: &NamedRow) -> bool {
        self.schema.unique_indices().iter().all(|&i| where_.contains_key(&self.schema.columns[i].name))
    }

    fn locate_by_index(&self, where_: &NamedRow) -> CResult<Option<(u64, NamedRow)>> {
        let key = codec::encode_key(&self.schema, where_)?;
        let entry = {
            let index = self.index.read().expect("index lock poisoned");
            match index.get(&key) {
                Some(entry) if entry.alive => *entry,
                _ => return Ok(None),
            }
        };

        let frame = rowlog::read_at_path(&self.data_path, entry.offset)?;
        if frame.tombstone != 0 {
            return Ok(None);
        }
        let row = codec::decode_payload(&frame.payload, &self.schema)?;
        if row_matches(&row, where_) {
            Ok(Some((entry.offset, row)))
        } else {
            Ok(None)
        }
    }

    fn locate_by_scan(&self, where_: &NamedRow) -> CResult<Option<(u64, NamedRow)>> {
        let (frames, _) = rowlog::scan_path(&self.data_path)?;
        for frame in frames {
            if frame.tombstone != 0 {
                continue;
            }
            let row = codec::decode_payload(&frame.payload, &self.schema)?;
            if row_matches(&row, where_) {
                return Ok(Some((frame.offset, row)));
            }
        }
        Ok(None)
    }
}

fn row_matches(row: &NamedRow, where_: &NamedRow) -> bool {
    where_.iter().all(|(k, v)| row.get(k) == Some(v))
}
