//! JSON conversion between the CLI's command-line input and QuixDB's typed
//! row values. A row/where/changes argument is a JSON object; each field is
//! decoded against the table's declared column type so that, for example,
//! `"age": 30` becomes `Value::Int` only if `age` is declared `int`.

use anyhow::{anyhow, Context, Result};
use quixdb::{Column, ColumnType, NamedRow, Schema, Value};

/// Parses a `--columns` argument: a JSON array of
/// `{"name": ..., "type": "str"|"int"|"float"|"bytes", "unique": bool}`.
pub fn parse_columns(raw: &str) -> Result<Vec<Column>> {
    let parsed: Vec<RawColumn> =
        serde_json::from_str(raw).context("--columns must be a JSON array of {name, type, unique}")?;
    parsed
        .into_iter()
        .map(|c| {
            let col_type = parse_column_type(&c.col_type)?;
            Ok(Column { name: c.name, col_type, unique: c.unique.unwrap_or(false) })
        })
        .collect()
}

fn parse_column_type(raw: &str) -> Result<ColumnType> {
    match raw {
        "str" => Ok(ColumnType::Str),
        "int" => Ok(ColumnType::Int),
        "float" => Ok(ColumnType::Float),
        "bytes" => Ok(ColumnType::Bytes),
        other => Err(anyhow!("unknown column type '{other}' (expected str, int, float, or bytes)")),
    }
}

#[derive(serde_derive::Deserialize)]
struct RawColumn {
    name: String,
    #[serde(rename = "type")]
    col_type: String,
    unique: Option<bool>,
}

/// Decodes a JSON object into a `NamedRow`, typing each field against
/// `schema`. `Bytes` columns take a JSON array of 0-255 integers; every
/// other column takes its natural JSON representation.
pub fn parse_row(raw: &str, schema: &Schema) -> Result<NamedRow> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).context("row/where/changes must be a JSON object")?;
    let mut row = NamedRow::new();
    for (key, json_value) in object {
        let col_type = schema
            .column_index(&key)
            .map(|i| schema.columns[i].col_type)
            .ok_or_else(|| anyhow!("unknown column '{key}'"))?;
        row.insert(key, json_to_value(col_type, json_value)?);
    }
    Ok(row)
}

fn json_to_value(col_type: ColumnType, value: serde_json::Value) -> Result<Value> {
    match (col_type, value) {
        (ColumnType::Str, serde_json::Value::String(s)) => Ok(Value::Str(s)),
        (ColumnType::Int, serde_json::Value::Number(n)) => {
            n.as_i64().map(Value::Int).ok_or_else(|| anyhow!("expected an integer, got {n}"))
        }
        (ColumnType::Float, serde_json::Value::Number(n)) => {
            n.as_f64().map(Value::Float).ok_or_else(|| anyhow!("expected a number, got {n}"))
        }
        (ColumnType::Bytes, serde_json::Value::Array(items)) => {
            let bytes = items
                .into_iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| anyhow!("bytes must be a JSON array of 0-255 integers"))
                })
                .collect::<Result<Vec<u8>>>()?;
            Ok(Value::Bytes(bytes))
        }
        (col_type, other) => Err(anyhow!("value {other} does not match column type {col_type:?}")),
    }
}

/// Renders a decoded row back to JSON for `select`'s output.
pub fn row_to_json(row: &NamedRow) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> =
        row.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect();
    serde_json::Value::Object(map)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bytes(b) => {
            serde_json::Value::Array(b.iter().map(|byte| serde_json::Value::Number((*byte).into())).collect())
        }
    }
}
