//! QuixDB is an embedded, file-backed key-value/table store: an append-only
//! row log per table, an in-memory primary index rebuilt by a single scan
//! on open, and a two-layer lock (in-process, then advisory filesystem)
//! guarding every mutation.
//!
//! ## Getting started
//!
//! ```rust
//! use quixdb::{Column, ColumnType, Database, Value};
//! use std::collections::BTreeMap;
//!
//! fn main() -> quixdb::CResult<()> {
//!     let dir = tempfile::tempdir().unwrap();
//!     let db = Database::open(dir.path())?;
//!
//!     db.create_table(
//!         "users",
//!         vec![
//!             Column { name: "email".into(), col_type: ColumnType::Str, unique: true },
//!             Column { name: "age".into(), col_type: ColumnType::Int, unique: false },
//!         ],
//!     )?;
//!
//!     let mut row = BTreeMap::new();
//!     row.insert("email".to_string(), Value::Str("a@example.com".into()));
//!     row.insert("age".to_string(), Value::Int(30));
//!     db.insert("users", row)?;
//!
//!     let mut where_ = BTreeMap::new();
//!     where_.insert("email".to_string(), Value::Str("a@example.com".into()));
//!     assert!(db.select("users", &where_)?.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod db;
pub mod error;
pub mod index;
pub mod lock;
pub mod log;
pub mod schema;
pub mod table;
pub mod value;

pub use db::Database;
pub use error::{CResult, Error};
pub use schema::{Column, ColumnType, Schema};
pub use table::Table;
pub use value::{NamedRow, Value};
