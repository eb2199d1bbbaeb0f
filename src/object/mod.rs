//! Runtime values shared by the compiler and the virtual machine.

use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use indexmap::IndexMap;

/// A runtime value in Monkey.
///
/// Booleans and null need no canonical shared instances here: the enum
/// variants are the canonical representation, and structural equality
/// preserves the comparison semantics that identity gave the original.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer. Arithmetic wraps (two's complement).
    Integer(i64),

    /// Boolean value.
    Boolean(bool),

    /// UTF-8 string value, immutable.
    String(String),

    /// Array value, heterogeneous.
    Array(Vec<Value>),

    /// Hash value. Keyed by [`HashKey`]; each entry keeps the original key
    /// value alongside the stored value. Iteration follows insertion order.
    Hash(IndexMap<HashKey, HashPair>),

    /// The absence of a value.
    Null,
}

/// A key-value entry in a hash, preserving the key as written.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// The derived key for hashable values: the value's type tag plus a 64-bit
/// key. Stable within a single VM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: &'static str,
    pub value: u64,
}

impl Value {
    /// The type tag observable at runtime, used for error messages and
    /// dispatch.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Boolean(_) => "Boolean",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Null => "Null",
        }
    }

    /// Everything is truthy except `false` and `null`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Derive the hash key for this value. Total on the hashable variants
    /// (integers, booleans, strings); `None` for everything else.
    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Value::Integer(n) => *n as u64,
            Value::Boolean(b) => *b as u64,
            Value::String(s) => {
                let mut hasher = FnvHasher::default();
                hasher.write(s.as_bytes());
                hasher.finish()
            }
            _ => return None,
        };

        Some(HashKey {
            kind: self.type_name(),
            value: key,
        })
    }
}

impl fmt::Display for Value {
    /// Format a value in its canonical inspection form, as printed by the
    /// REPL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Integer(1).type_name(), "Integer");
        assert_eq!(Value::Boolean(true).type_name(), "Boolean");
        assert_eq!(Value::String("x".to_string()).type_name(), "String");
        assert_eq!(Value::Array(vec![]).type_name(), "Array");
        assert_eq!(Value::Hash(IndexMap::new()).type_name(), "Hash");
        assert_eq!(Value::Null.type_name(), "Null");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_integer_hash_key_is_unsigned_reinterpretation() {
        let key = Value::Integer(-1).hash_key().unwrap();
        assert_eq!(key.kind, "Integer");
        assert_eq!(key.value, u64::MAX);
        assert_eq!(Value::Integer(7).hash_key().unwrap().value, 7);
    }

    #[test]
    fn test_boolean_hash_keys() {
        assert_eq!(Value::Boolean(true).hash_key().unwrap().value, 1);
        assert_eq!(Value::Boolean(false).hash_key().unwrap().value, 0);
    }

    #[test]
    fn test_string_hash_keys() {
        let hello1 = Value::String("Hello World".to_string());
        let hello2 = Value::String("Hello World".to_string());
        let other = Value::String("My name is johnny".to_string());

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_ne!(hello1.hash_key(), other.hash_key());
    }

    #[test]
    fn test_equal_keys_of_different_types_do_not_collide() {
        // Boolean true and integer 1 share the 64-bit key but not the tag.
        let one = Value::Integer(1).hash_key().unwrap();
        let yes = Value::Boolean(true).hash_key().unwrap();
        assert_eq!(one.value, yes.value);
        assert_ne!(one, yes);
    }

    #[test]
    fn test_aggregates_are_not_hashable() {
        assert!(Value::Array(vec![]).hash_key().is_none());
        assert!(Value::Hash(IndexMap::new()).hash_key().is_none());
        assert!(Value::Null.hash_key().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-5).to_string(), "-5");
        assert_eq!(Value::String("monkey".to_string()).to_string(), "monkey");
        assert_eq!(
            Value::Array(vec![
                Value::Integer(1),
                Value::String("two".to_string()),
                Value::Array(vec![Value::Boolean(true)]),
            ])
            .to_string(),
            "[1, two, [true]]"
        );

        let mut pairs = IndexMap::new();
        let key = Value::String("foo".to_string());
        pairs.insert(
            key.hash_key().unwrap(),
            HashPair {
                key,
                value: Value::Integer(5),
            },
        );
        assert_eq!(Value::Hash(pairs).to_string(), "{foo: 5}");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(
            Value::String("a".to_string()),
            Value::String("a".to_string())
        );
        assert_eq!(
            Value::Array(vec![Value::Integer(1)]),
            Value::Array(vec![Value::Integer(1)])
        );
        assert_ne!(Value::Integer(1), Value::Boolean(true));
    }
}
