use crate::error::{Result, SchemaError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Semantic type of a field
///
/// A closed set: every consumer can match exhaustively on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Schema {
    Null,
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Enumeration with its ordered symbols
    Enum(Vec<String>),
    Array(Box<Schema>),
    Map {
        keys: Box<Schema>,
        values: Box<Schema>,
    },
    Record(Arc<RecordSchema>),
    /// Ordered union branches
    Union(Vec<Schema>),
}

impl Schema {
    /// Union of `inner` and `Null`
    pub fn nullable(inner: Schema) -> Self {
        Schema::Union(vec![inner, Schema::Null])
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// Map with string keys
    pub fn map(values: Schema) -> Self {
        Schema::Map {
            keys: Box::new(Schema::String),
            values: Box::new(values),
        }
    }

    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Enum(symbols.into_iter().map(Into::into).collect())
    }

    pub fn record(schema: RecordSchema) -> Self {
        Schema::Record(Arc::new(schema))
    }

    /// True for a union that contains a `Null` branch
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Union(branches) => branches.iter().any(|b| matches!(b, Schema::Null)),
            _ => false,
        }
    }

    /// The non-null branch of a two-branch nullable union
    pub fn non_nullable(&self) -> Option<&Schema> {
        match self {
            Schema::Union(branches) if branches.len() == 2 && self.is_nullable() => {
                branches.iter().find(|b| !matches!(b, Schema::Null))
            }
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Enum(_) => "enum",
            Schema::Array(_) => "array",
            Schema::Map { .. } => "map",
            Schema::Record(_) => "record",
            Schema::Union(_) => "union",
        }
    }

    /// Feeds the canonical byte form into `hasher`.
    ///
    /// Every variant writes a one-byte tag followed by its payload; strings
    /// and sequences are length-prefixed so distinct shapes never collide
    /// on concatenation.
    fn feed(&self, hasher: &mut Sha256) {
        match self {
            Schema::Null => hasher.update([0u8]),
            Schema::Boolean => hasher.update([1u8]),
            Schema::Int => hasher.update([2u8]),
            Schema::Long => hasher.update([3u8]),
            Schema::Float => hasher.update([4u8]),
            Schema::Double => hasher.update([5u8]),
            Schema::Bytes => hasher.update([6u8]),
            Schema::String => hasher.update([7u8]),
            Schema::Enum(symbols) => {
                hasher.update([8u8]);
                feed_len(hasher, symbols.len());
                for symbol in symbols {
                    feed_str(hasher, symbol);
                }
            }
            Schema::Array(items) => {
                hasher.update([9u8]);
                items.feed(hasher);
            }
            Schema::Map { keys, values } => {
                hasher.update([10u8]);
                keys.feed(hasher);
                values.feed(hasher);
            }
            Schema::Record(record) => {
                hasher.update([11u8]);
                record.feed(hasher);
            }
            Schema::Union(branches) => {
                hasher.update([12u8]);
                feed_len(hasher, branches.len());
                for branch in branches {
                    branch.feed(hasher);
                }
            }
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Array(items) => write!(f, "array<{}>", items),
            Schema::Map { keys, values } => write!(f, "map<{}, {}>", keys, values),
            Schema::Record(record) => write!(f, "record {}", record.name()),
            Schema::Union(branches) => {
                let names: Vec<String> = branches.iter().map(|b| b.to_string()).collect();
                write!(f, "union[{}]", names.join(", "))
            }
            other => f.write_str(other.type_name()),
        }
    }
}

fn feed_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_be_bytes());
}

fn feed_str(hasher: &mut Sha256, s: &str) {
    feed_len(hasher, s.len());
    hasher.update(s.as_bytes());
}

/// A named field of a record schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
    schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Structural fingerprint of a record schema
///
/// The first eight bytes of the SHA-256 of the schema's canonical form.
/// Equal schemas always share a hash; the converse is not guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaHash(u64);

impl SchemaHash {
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SchemaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Ordered, uniquely named fields under a record name
///
/// Immutable once built. Equality and hashing only look at the name and the
/// fields; the lookup index and the memoized fingerprint are derived data.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    fingerprint: OnceLock<SchemaHash>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if fields.is_empty() {
            return Err(SchemaError::NoFields(name));
        }

        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if index.insert(field.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateField {
                    record: name,
                    field: field.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            fields,
            index,
            fingerprint: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Structural hash of this schema, computed on first use
    pub fn fingerprint(&self) -> SchemaHash {
        *self.fingerprint.get_or_init(|| {
            let mut hasher = Sha256::new();
            self.feed(&mut hasher);
            let digest = hasher.finalize();
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            SchemaHash(u64::from_be_bytes(prefix))
        })
    }

    fn feed(&self, hasher: &mut Sha256) {
        feed_str(hasher, &self.name);
        feed_len(hasher, self.fields.len());
        for field in &self.fields {
            feed_str(hasher, &field.name);
            field.schema.feed(hasher);
        }
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for RecordSchema {}

impl Hash for RecordSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.fields.hash(state);
    }
}
