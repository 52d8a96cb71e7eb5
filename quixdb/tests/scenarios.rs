//! End-to-end scenarios and testable properties, exercised through the
//! public `Database` surface (and, where a scenario requires simulating a
//! crash mid-operation, through the lower-level `Log`/`Schema`/`codec`
//! modules directly).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use quixdb::schema::{Column, ColumnType, Schema};
use quixdb::{codec, log as rowlog, Database, NamedRow, Value};

fn email_schema() -> Vec<Column> {
    vec![
        Column { name: "Email".into(), col_type: ColumnType::Str, unique: true },
        Column { name: "Name".into(), col_type: ColumnType::Str, unique: false },
    ]
}

fn row(email: &str, name: &str) -> NamedRow {
    let mut row = BTreeMap::new();
    row.insert("Email".to_string(), Value::Str(email.to_string()));
    row.insert("Name".to_string(), Value::Str(name.to_string()));
    row
}

fn where_email(email: &str) -> NamedRow {
    let mut w = BTreeMap::new();
    w.insert("Email".to_string(), Value::Str(email.to_string()));
    w
}

/// S1 (unique reject) through S3 (delete then reinsert) chained exactly as
/// spec.md's scenarios are written: each step continues from the last.
#[test]
fn s1_through_s3_unique_reject_rename_then_delete_and_reinsert() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.create_table("people", email_schema()).unwrap();

    // S1
    db.insert("people", row("a@x", "A")).unwrap();
    let err = db.insert("people", row("a@x", "B")).unwrap_err();
    assert!(matches!(err, quixdb::Error::DuplicateKey(_)));
    assert_eq!(db.select("people", &where_email("a@x")).unwrap(), Some(row("a@x", "A")));

    // S2
    let mut changes = BTreeMap::new();
    changes.insert("Email".to_string(), Value::Str("b@x".into()));
    db.update("people", &where_email("a@x"), &changes).unwrap();
    assert_eq!(db.select("people", &where_email("a@x")).unwrap(), None);
    assert_eq!(db.select("people", &where_email("b@x")).unwrap(), Some(row("b@x", "A")));

    // S3
    db.delete("people", &where_email("b@x")).unwrap();
    db.insert("people", row("b@x", "C")).unwrap();
    assert_eq!(db.select("people", &where_email("b@x")).unwrap(), Some(row("b@x", "C")));
}

/// S4 (crash mid-update): simulate a process kill between the new frame's
/// append and the old frame's tombstone by driving the log directly,
/// bypassing `Table::update`'s normal append-then-tombstone sequencing.
#[test]
fn s4_crash_mid_update_leaves_the_later_frame_authoritative() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Schema::new(email_schema());
    let schema_path = dir.path().join("schema.bin");
    schema.write_atomic(&schema_path).unwrap();

    let data_path = dir.path().join("data.dat");
    {
        let mut log = rowlog::Log::open(&data_path).unwrap();
        // Establish the row from S3's end state.
        let frame = codec::encode(&schema, &row("b@x", "C")).unwrap();
        log.append(&frame).unwrap();

        // "Crash mid-update": append the renamed row's frame but never
        // tombstone the old one.
        let renamed = codec::encode(&schema, &row("b@x", "D")).unwrap();
        log.append(&renamed).unwrap();
    }

    let table = quixdb::Table::open(dir.path()).unwrap();
    let found = table.select(&where_email("b@x")).unwrap().unwrap();
    assert_eq!(found, row("b@x", "D"));
}

/// S5 (torn append): truncating the tail of `data.dat` makes the partial
/// frame invisible but preserves every complete frame before it, and the
/// table remains fully writable afterward.
#[test]
fn s5_torn_append_truncates_cleanly_and_stays_writable() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.create_table("people", email_schema()).unwrap();
    db.insert("people", row("a@x", "A")).unwrap();

    let data_path = dir.path().join("people").join("data.dat");
    let full_len = std::fs::metadata(&data_path).unwrap().len();
    let f = std::fs::OpenOptions::new().write(true).open(&data_path).unwrap();
    f.set_len(full_len - 7).unwrap();
    drop(f);

    let db = Database::open(dir.path()).unwrap();
    assert_eq!(db.select("people", &where_email("a@x")).unwrap(), None);
    db.insert("people", row("c@x", "Z")).unwrap();
    assert_eq!(db.select("people", &where_email("c@x")).unwrap(), Some(row("c@x", "Z")));
}

/// S6 (typed values): every supported column type round-trips bit-for-bit
/// through insert/select, including a negative int and a float that would
/// not compare equal under a tolerant epsilon comparison.
#[test]
fn s6_typed_values_round_trip_bit_for_bit() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.create_table(
        "typed",
        vec![
            Column { name: "Id".into(), col_type: ColumnType::Int, unique: true },
            Column { name: "W".into(), col_type: ColumnType::Float, unique: false },
            Column { name: "Tag".into(), col_type: ColumnType::Bytes, unique: false },
        ],
    )
    .unwrap();

    let mut r = BTreeMap::new();
    r.insert("Id".to_string(), Value::Int(-1));
    r.insert("W".to_string(), Value::Float(3.5));
    r.insert("Tag".to_string(), Value::Bytes(vec![0x00, 0x01]));
    db.insert("typed", r.clone()).unwrap();

    let mut w = BTreeMap::new();
    w.insert("Id".to_string(), Value::Int(-1));
    assert_eq!(db.select("typed", &w).unwrap(), Some(r));
}

/// Property 3: reopening rebuilds an index whose mapping is exactly the
/// one a fresh `select` against the pre-close state would have returned,
/// across inserts, a rename, and a delete.
#[test]
fn property_index_consistency_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open(dir.path()).unwrap();
        db.create_table("people", email_schema()).unwrap();
        db.insert("people", row("a@x", "A")).unwrap();
        db.insert("people", row("b@x", "B")).unwrap();
        let mut changes = BTreeMap::new();
        changes.insert("Email".to_string(), Value::Str("c@x".into()));
        db.update("people", &where_email("a@x"), &changes).unwrap();
        db.delete("people", &where_email("b@x")).unwrap();
    }

    let db = Database::open(dir.path()).unwrap();
    assert_eq!(db.select("people", &where_email("a@x")).unwrap(), None);
    assert_eq!(db.select("people", &where_email("b@x")).unwrap(), None);
    assert_eq!(db.select("people", &where_email("c@x")).unwrap(), Some(row("c@x", "A")));
}

/// Property 4: a torn tail of any length shorter than the last frame
/// leaves every earlier frame intact and readable.
#[test]
fn property_torn_tail_tolerance_across_truncation_lengths() {
    for n in [1u64, 3, 7] {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        db.create_table("people", email_schema()).unwrap();
        db.insert("people", row("a@x", "A")).unwrap();
        db.insert("people", row("b@x", "B")).unwrap();

        let data_path = dir.path().join("people").join("data.dat");
        let full_len = std::fs::metadata(&data_path).unwrap().len();
        let f = std::fs::OpenOptions::new().write(true).open(&data_path).unwrap();
        f.set_len(full_len - n).unwrap();
        drop(f);

        let db = Database::open(dir.path()).unwrap();
        assert_eq!(db.select("people", &where_email("a@x")).unwrap(), Some(row("a@x", "A")));
    }
}

/// Property 5 (partial): under many concurrent threads hammering
/// insert/select/delete against one table, no operation returns a
/// spurious error and the final state still satisfies uniqueness — no two
/// distinct live rows share an `Email`.
#[test]
fn property_concurrency_many_threads_no_spurious_errors() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(dir.path()).unwrap());
    db.create_table("people", email_schema()).unwrap();

    let mut handles = Vec::new();
    for t in 0..8 {
        let db = db.clone();
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let email = format!("user{}@x", (t * 50 + i) % 40);
                match db.insert("people", row(&email, "A")) {
                    Ok(()) | Err(quixdb::Error::DuplicateKey(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
                db.select("people", &where_email(&email)).unwrap();
                if i % 7 == 0 {
                    match db.delete("people", &where_email(&email)) {
                        Ok(()) | Err(quixdb::Error::NotFound) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Uniqueness: at most one live row per distinct email value.
    let mut seen = std::collections::HashSet::new();
    for i in 0..40 {
        let email = format!("user{i}@x");
        if let Some(found) = db.select("people", &where_email(&email)).unwrap() {
            assert_eq!(found.get("Email"), Some(&Value::Str(email.clone())));
            assert!(seen.insert(email));
        }
    }
}
