//! Row Codec (spec §4.1): converts between a named row and its on-disk
//! frame representation, and vice versa. Binary framing is chosen over a
//! textual format (JSON, etc.) because the length prefix gives O(1)
//! frame-boundary recovery and never confuses a string that merely looks
//! like a number with an actual number.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CResult, Error};
use crate::schema::{ColumnType, Schema};
use crate::value::{NamedRow, Value};

/// Encodes `row` against `schema`, returning a full frame (tombstone byte,
/// length prefix, payload) with tombstone always 0 (live).
///
/// Fails with `SchemaViolation` if `row` is missing a declared column, has
/// the wrong type for one, or names a column the schema doesn't have.
pub fn encode(schema: &Schema, row: &NamedRow) -> CResult<Vec<u8>> {
    if row.len() != schema.columns.len() {
        if let Some(unknown) = row.keys().find(|k| schema.column_index(k).is_none()) {
            return Err(Error::SchemaViolation(format!("unknown column '{unknown}'")));
        }
    }

    let mut payload = Vec::new();
    for col in &schema.columns {
        let value = row
            .get(&col.name)
            .ok_or_else(|| Error::SchemaViolation(format!("missing column '{}'", col.name)))?;
        write_value(&mut payload, col.col_type, value)?;
    }

    let mut frame = Vec::with_capacity(5 + payload.len());
    frame.write_u8(0)?;
    frame.write_u32::<LittleEndian>(payload.len() as u32)?;
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn write_value(out: &mut Vec<u8>, col_type: ColumnType, value: &Value) -> CResult<()> {
    match (col_type, value) {
        (ColumnType::Str, Value::Str(s)) => {
            let bytes = s.as_bytes();
            out.write_u32::<LittleEndian>(bytes.len() as u32)?;
            out.extend_from_slice(bytes);
            Ok(())
        }
        (ColumnType::Bytes, Value::Bytes(b)) => {
            out.write_u32::<LittleEndian>(b.len() as u32)?;
            out.extend_from_slice(b);
            Ok(())
        }
        (ColumnType::Int, Value::Int(i)) => {
            out.write_i64::<LittleEndian>(*i)?;
            Ok(())
        }
        (ColumnType::Float, Value::Float(v)) => {
            out.write_f64::<LittleEndian>(*v)?;
            Ok(())
        }
        _ => Err(Error::SchemaViolation(format!(
            "value does not match declared type {col_type:?}"
        ))),
    }
}

/// Peeks at the tombstone byte and payload length without allocating or
/// reading the payload. `bytes` need only contain the 5-byte header.
pub fn frame_length(bytes: &[u8]) -> CResult<(u8, u32)> {
    if bytes.len() < 5 {
        return Err(Error::CorruptFrame("frame header shorter than 5 bytes".into()));
    }
    let tombstone = bytes[0];
    let len = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Ok((tombstone, len))
}

/// Decodes a full frame (header + payload) into a named row, typed per
/// `schema`. Fails with `CorruptFrame` if the declared payload length
/// exceeds the buffer, or an inner length-prefixed field would overrun it.
pub fn decode(bytes: &[u8], schema: &Schema) -> CResult<NamedRow> {
    let (_, payload_len) = frame_length(bytes)?;
    let payload_len = payload_len as usize;
    if bytes.len() < 5 + payload_len {
        return Err(Error::CorruptFrame("payload length exceeds buffer".into()));
    }
    let payload = &bytes[5..5 + payload_len];
    decode_payload(payload, schema)
}

/// Decodes a bare payload (no tombstone/length header) against `schema`.
/// Used by the index builder, which only has `ScannedFrame::payload` to
/// work with.
pub(crate) fn decode_payload(payload: &[u8], schema: &Schema) -> CResult<NamedRow> {
    let mut cursor = Cursor::new(payload);
    let mut row: NamedRow = BTreeMap::new();
    for col in &schema.columns {
        let value = match col.col_type {
            ColumnType::Str => {
                let bytes = read_length_prefixed(&mut cursor)?;
                Value::Str(String::from_utf8(bytes)?)
            }
            ColumnType::Bytes => Value::Bytes(read_length_prefixed(&mut cursor)?),
            ColumnType::Int => Value::Int(
                cursor
                    .read_i64::<LittleEndian>()
                    .map_err(|e| Error::CorruptFrame(e.to_string()))?,
            ),
            ColumnType::Float => Value::Float(
                cursor
                    .read_f64::<LittleEndian>()
                    .map_err(|e| Error::CorruptFrame(e.to_string()))?,
            ),
        };
        row.insert(col.name.clone(), value);
    }
    Ok(row)
}

fn read_length_prefixed(cursor: &mut Cursor<&[u8]>) -> CResult<Vec<u8>> {
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::CorruptFrame(e.to_string()))? as usize;
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf).map_err(|_| Error::CorruptFrame("field overruns payload".into()))?;
    Ok(buf)
}

/// Encodes the unique-key tuple for `row` (one entry per schema column
/// marked UNIQUE, in schema order) into a byte string suitable as an index
/// key. Uses the same length-prefixed scheme as string/bytes payload
/// fields so that no two distinct tuples can collide on their encoding.
pub fn encode_key(schema: &Schema, row: &NamedRow) -> CResult<Vec<u8>> {
    let mut key = Vec::new();
    for &idx in &schema.unique_indices() {
        let col = &schema.columns[idx];
        let value = row
            .get(&col.name)
            .ok_or_else(|| Error::SchemaViolation(format!("missing column '{}'", col.name)))?;
        write_value(&mut key, col.col_type, value)?;
    }
    Ok(key)
}
