use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CResult, Error};

const MAGIC: &[u8; 4] = b"QXSC";
const VERSION: u32 = 1;

/// The closed set of column types a schema may declare (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Str,
    Int,
    Float,
    Bytes,
}

impl ColumnType {
    fn code(self) -> u8 {
        match self {
            ColumnType::Str => b's',
            ColumnType::Int => b'i',
            ColumnType::Float => b'f',
            ColumnType::Bytes => b'b',
        }
    }

    fn from_code(code: u8) -> CResult<Self> {
        match code {
            b's' => Ok(ColumnType::Str),
            b'i' => Ok(ColumnType::Int),
            b'f' => Ok(ColumnType::Float),
            b'b' => Ok(ColumnType::Bytes),
            other => {
                Err(Error::CorruptFrame(format!("unknown column type code {other:#x}")))
            }
        }
    }
}

/// One column in a table's schema: a name, a type, and whether it
/// participates in the unique key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub col_type: ColumnType,
    pub unique: bool,
}

/// An ordered, immutable sequence of columns (spec §3 "Schema").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Indices of the columns that make up the unique key, in schema order.
    /// Empty if the table declared no UNIQUE columns.
    pub fn unique_indices(&self) -> Vec<usize> {
        self.columns.iter().enumerate().filter(|(_, c)| c.unique).map(|(i, _)| i).collect()
    }

    pub fn has_unique_key(&self) -> bool {
        self.columns.iter().any(|c| c.unique)
    }

    /// Writes the schema header via write-to-temporary-then-rename, fsyncing
    /// the temporary file before rename and the parent directory after
    /// rename (spec §6 "Atomic writes").
    pub fn write_atomic(&self, path: &Path) -> CResult<()> {
        let dir = path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "schema path has no parent"))
        })?;
        fs::create_dir_all(dir)?;

        let tmp_path = dir.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("schema.bin")
        ));

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&self.encode())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        let dir_handle = File::open(dir)?;
        // Directories cannot be opened for write on some platforms, but a
        // read-only handle's sync_all() still forces the rename's directory
        // entry to durable storage on the filesystems this engine targets.
        let _ = dir_handle.sync_all();

        Ok(())
    }

    pub fn read(path: &Path) -> CResult<Self> {
        let mut file = File::open(path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Self::decode(&buf)
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.write_u32::<LittleEndian>(VERSION).unwrap();
        buf.write_u32::<LittleEndian>(self.columns.len() as u32).unwrap();
        for col in &self.columns {
            let name_bytes = col.name.as_bytes();
            buf.write_u16::<LittleEndian>(name_bytes.len() as u16).unwrap();
            buf.extend_from_slice(name_bytes);
            buf.write_u8(col.col_type.code()).unwrap();
            buf.write_u8(if col.unique { 1 } else { 0 }).unwrap();
        }
        buf
    }

    fn decode(buf: &[u8]) -> CResult<Self> {
        let mut cursor = std::io::Cursor::new(buf);
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::CorruptLog("schema file magic mismatch".into()));
        }
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::CorruptLog(format!("unsupported schema version {version}")));
        }
        let count = cursor.read_u32::<LittleEndian>()?;
        let mut columns = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = cursor.read_u16::<LittleEndian>()? as usize;
            let mut name_buf = vec![0u8; name_len];
            cursor.read_exact(&mut name_buf)?;
            let name = String::from_utf8(name_buf)?;
            let type_code = cursor.read_u8()?;
            let col_type = ColumnType::from_code(type_code)?;
            let unique = cursor.read_u8()? != 0;
            columns.push(Column { name, col_type, unique });
        }
        Ok(Schema { columns })
    }

    /// True if `other` is a compatible re-declaration of the same table:
    /// same columns, in the same order, with the same types and the same
    /// unique set (spec §6 `SchemaConflict`).
    pub fn compatible_with(&self, other: &Schema) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            Column { name: "Email".into(), col_type: ColumnType::Str, unique: true },
            Column { name: "Name".into(), col_type: ColumnType::Str, unique: false },
        ])
    }

    #[test]
    fn encode_decode_round_trip() {
        let schema = sample();
        let decoded = Schema::decode(&schema.encode()).unwrap();
        assert_eq!(schema, decoded);
    }

    #[test]
    fn write_atomic_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.bin");
        let schema = sample();
        schema.write_atomic(&path).unwrap();
        let read_back = Schema::read(&path).unwrap();
        assert_eq!(schema, read_back);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = Schema::decode(b"xxxxxxxxxxxx").unwrap_err();
        assert!(matches!(err, Error::CorruptLog(_)));
    }

    #[test]
    fn unique_indices_tracks_declared_columns() {
        let schema = sample();
        assert_eq!(schema.unique_indices(), vec![0]);
        assert!(schema.has_unique_key());
    }
}
