//! Primary Index (spec §4.4): an in-memory mapping from unique-key tuples
//! to the offset and liveness of their latest frame, rebuilt on open by a
//! single linear scan of the log.

use std::collections::HashMap;

use crate::codec;
use crate::error::CResult;
use crate::log::ScannedFrame;
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u32,
    pub alive: bool,
}

/// Keyed by the encoded unique-key tuple (`codec::encode_key`). Empty for
/// tables with no UNIQUE columns — such tables have no fast path and every
/// operation falls back to a linear scan.
pub type Index = HashMap<Vec<u8>, IndexEntry>;

/// Rebuilds the index from a log already read into memory in write order.
/// See spec §4.4 for the exact rule governing how tombstones interact with
/// entries superseded by a later write for the same key.
pub fn build(frames: &[ScannedFrame], schema: &Schema) -> CResult<Index> {
    let mut index = Index::new();
    if !schema.has_unique_key() {
        return Ok(index);
    }

    for frame in frames {
        let row = codec::decode_payload(&frame.payload, schema)?;
        let key = codec::encode_key(schema, &row)?;
        let length = 5 + frame.payload.len() as u32;

        if frame.tombstone == 0 {
            index.insert(key, IndexEntry { offset: frame.offset, length, alive: true });
        } else if let Some(entry) = index.get_mut(&key) {
            if entry.offset == frame.offset {
                entry.alive = false;
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec as root_codec;
    use crate::schema::{Column, ColumnType};
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn schema() -> Schema {
        Schema::new(vec![Column { name: "Email".into(), col_type: ColumnType::Str, unique: true }])
    }

    fn row(email: &str) -> BTreeMap<String, Value> {
        let mut row = BTreeMap::new();
        row.insert("Email".to_string(), Value::Str(email.to_string()));
        row
    }

    fn frame_of(schema: &Schema, email: &str, offset: u64, tombstone: u8) -> ScannedFrame {
        let full = root_codec::encode(schema, &row(email)).unwrap();
        ScannedFrame { offset, tombstone, payload: full[5..].to_vec() }
    }

    #[test]
    fn later_frame_wins_when_both_live() {
        let schema = schema();
        let frames =
            vec![frame_of(&schema, "a@x", 0, 0), frame_of(&schema, "a@x", 100, 0)];
        let index = build(&frames, &schema).unwrap();
        let key = root_codec::encode_key(&schema, &row("a@x")).unwrap();
        let entry = index.get(&key).unwrap();
        assert_eq!(entry.offset, 100);
        assert!(entry.alive);
    }

    #[test]
    fn stale_tombstone_is_ignored() {
        let schema = schema();
        // offset 0: insert, offset 50: re-insert after a (never recorded)
        // rename supersedes offset 0, then a tombstone for the *old*
        // offset must not affect the current (offset 50) entry.
        let frames = vec![
            frame_of(&schema, "a@x", 0, 0),
            frame_of(&schema, "a@x", 50, 0),
            ScannedFrame { offset: 0, tombstone: 1, payload: frame_of(&schema, "a@x", 0, 0).payload },
        ];
        let index = build(&frames, &schema).unwrap();
        let key = root_codec::encode_key(&schema, &row("a@x")).unwrap();
        let entry = index.get(&key).unwrap();
        assert_eq!(entry.offset, 50);
        assert!(entry.alive);
    }

    #[test]
    fn tombstone_at_current_offset_marks_dead() {
        let schema = schema();
        let frames = vec![frame_of(&schema, "a@x", 0, 0), frame_of(&schema, "a@x", 0, 1)];
        let index = build(&frames, &schema).unwrap();
        let key = root_codec::encode_key(&schema, &row("a@x")).unwrap();
        assert!(!index.get(&key).unwrap().alive);
    }

    #[test]
    fn no_unique_columns_yields_empty_index() {
        let schema = Schema::new(vec![Column {
            name: "Name".into(),
            col_type: ColumnType::Str,
            unique: false,
        }]);
        let frames = vec![];
        let index = build(&frames, &schema).unwrap();
        assert!(index.is_empty());
    }
}
