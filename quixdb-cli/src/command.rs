//! The CLI's subcommands: thin forwarders onto `quixdb::Database`. Parsing
//! and validation of row/where/changes JSON lives in `crate::row`; this
//! module only resolves the database path, dispatches, and prints.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use log::info;
use quixdb::Database;

use crate::config::Config;
use crate::row;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Declare a table, creating it if it does not already exist.
    CreateTable {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        /// JSON array of {"name", "type": "str"|"int"|"float"|"bytes", "unique"}.
        #[clap(long)]
        columns: String,
    },
    /// Insert one row into a table.
    Insert {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        /// JSON object mapping column name to value.
        #[clap(long)]
        row: String,
    },
    /// Insert a JSON array of rows into a table; a failure on one row does
    /// not prevent the others from being committed.
    BulkInsert {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        /// JSON array of row objects.
        #[clap(long)]
        rows: String,
    },
    /// Print the first row matching a where clause, if any.
    Select {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        #[clap(long = "where")]
        where_: String,
    },
    /// Merge changes into the row matching a where clause.
    Update {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        #[clap(long = "where")]
        where_: String,
        #[clap(long)]
        changes: String,
    },
    /// Tombstone the row matching a where clause.
    Delete {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
        #[clap(long = "where")]
        where_: String,
    },
    /// Rewrite a table's log, dropping tombstoned and superseded frames.
    Compact {
        #[clap(long)]
        db: Option<PathBuf>,
        table: String,
    },
}

pub fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::CreateTable { db, table, columns } => {
            let db = resolve_db(db, config)?;
            info!("create-table {table} at {}", db.display());
            let columns = row::parse_columns(&columns)?;
            let database = Database::open(&db).context("opening database")?;
            database.create_table(&table, columns).context("creating table")?;
            println!("table '{table}' ready");
            Ok(())
        }
        Command::Insert { db, table, row: row_json } => {
            let db = resolve_db(db, config)?;
            info!("insert into {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            let schema = database.schema_of(&table).context("looking up table schema")?;
            let row_value = row::parse_row(&row_json, &schema)?;
            database.insert(&table, row_value).context("inserting row")?;
            println!("inserted");
            Ok(())
        }
        Command::BulkInsert { db, table, rows } => {
            let db = resolve_db(db, config)?;
            info!("bulk-insert into {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            let schema = database.schema_of(&table).context("looking up table schema")?;
            let raw_rows: Vec<serde_json::Value> =
                serde_json::from_str(&rows).context("--rows must be a JSON array of row objects")?;
            let parsed = raw_rows
                .into_iter()
                .map(|v| row::parse_row(&v.to_string(), &schema))
                .collect::<Result<Vec<_>>>()?;
            let results = database.bulk_insert(&table, parsed).context("inserting rows")?;
            let failed = results.iter().filter(|r| r.is_err()).count();
            println!("inserted {} row(s), {} failed", results.len() - failed, failed);
            for (i, result) in results.iter().enumerate() {
                if let Err(err) = result {
                    println!("  row {i}: {err}");
                }
            }
            Ok(())
        }
        Command::Select { db, table, where_ } => {
            let db = resolve_db(db, config)?;
            info!("select from {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            let schema = database.schema_of(&table).context("looking up table schema")?;
            let where_value = row::parse_row(&where_, &schema)?;
            match database.select(&table, &where_value).context("selecting row")? {
                Some(row_value) => println!("{}", row::row_to_json(&row_value)),
                None => println!("null"),
            }
            Ok(())
        }
        Command::Update { db, table, where_, changes } => {
            let db = resolve_db(db, config)?;
            info!("update {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            let schema = database.schema_of(&table).context("looking up table schema")?;
            let where_value = row::parse_row(&where_, &schema)?;
            let changes_value = row::parse_row(&changes, &schema)?;
            database.update(&table, &where_value, &changes_value).context("updating row")?;
            println!("updated");
            Ok(())
        }
        Command::Delete { db, table, where_ } => {
            let db = resolve_db(db, config)?;
            info!("delete from {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            let schema = database.schema_of(&table).context("looking up table schema")?;
            let where_value = row::parse_row(&where_, &schema)?;
            database.delete(&table, &where_value).context("deleting row")?;
            println!("deleted");
            Ok(())
        }
        Command::Compact { db, table } => {
            let db = resolve_db(db, config)?;
            info!("compact {table} at {}", db.display());
            let database = Database::open(&db).context("opening database")?;
            database.compact(&table).context("compacting table")?;
            println!("compacted");
            Ok(())
        }
    }
}

fn resolve_db(db: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    db.or_else(|| config.db_dir.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow!("no database directory given; pass --db or set db_dir in the config file"))
}
