use std::collections::BTreeMap;

/// A single typed column value (spec §3 "Row").
///
/// Equality is the natural equality of the underlying type, except for
/// `Float`, which compares by IEEE-754 bit pattern rather than `==` so that
/// duplicate-key detection on a unique float column is well defined (see
/// SPEC_FULL.md's Row Codec notes).
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Value::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Value::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Bytes(b) => {
                3u8.hash(state);
                b.hash(state);
            }
        }
    }
}

/// A named row, as seen at the public API boundary. Internally a row is a
/// `Vec<Value>` aligned with the schema's column order (see `Table`); this
/// map form exists only for callers.
pub type NamedRow = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float(0.0), Value::Float(0.0));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert!(Value::Float(f64::NAN) != Value::Float(1.0));
    }

    #[test]
    fn cross_type_values_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Str("1".into()), Value::Int(1));
    }
}
