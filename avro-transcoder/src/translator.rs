//! Structured-record schema to Avro schema translation
//!
//! The source schema is rendered into Avro's JSON schema form and handed to
//! `apache_avro` for parsing. Parsing the rendered text is the validation
//! step: names, symbols and union shapes are checked by the Avro parser, and
//! any rejection surfaces as [`TranscodeError::SchemaParse`].

use crate::error::{Result, TranscodeError};
use apache_avro::schema::{Name, RecordField, Schema as AvroSchema};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use structured_record::{RecordSchema, Schema};

/// Derives an Avro schema from a structured-record schema
///
/// Implementations must be pure: the same input always yields a structurally
/// identical output. The schema cache relies on it to skip locking while
/// deriving.
pub trait SchemaTranslator: Send + Sync + fmt::Debug {
    fn translate(&self, schema: &RecordSchema) -> Result<TargetSchema>;
}

/// Translator producing Avro schemas through the JSON schema form
#[derive(Debug, Default)]
pub struct AvroSchemaTranslator;

impl AvroSchemaTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Avro JSON form of `schema`
    pub fn render(&self, schema: &RecordSchema) -> Result<Value> {
        Renderer::default().record(schema)
    }
}

impl SchemaTranslator for AvroSchemaTranslator {
    fn translate(&self, schema: &RecordSchema) -> Result<TargetSchema> {
        let rendered = self.render(schema)?;
        let parsed = AvroSchema::parse(&rendered).map_err(|e| {
            TranscodeError::SchemaParse(format!("record '{}': {}", schema.name(), e))
        })?;
        TargetSchema::new(parsed)
    }
}

/// Named type already emitted in the schema being rendered
enum Defined {
    Record(Arc<RecordSchema>),
    Enum(Vec<String>),
}

/// Avro requires every named type to be defined exactly once per schema;
/// later uses refer to it by full name.
#[derive(Default)]
struct Renderer {
    defined: HashMap<String, Defined>,
    /// Namespace of the record being rendered, inherited by undotted names
    namespace: Option<String>,
}

impl Renderer {
    fn record(&mut self, schema: &RecordSchema) -> Result<Value> {
        let fullname = self.qualify(schema.name())?;
        let enclosing = std::mem::replace(&mut self.namespace, namespace_of(&fullname));
        let fields = schema
            .fields()
            .iter()
            .map(|field| {
                let rendered = self.schema(field.schema())?;
                Ok(json!({ "name": field.name(), "type": rendered }))
            })
            .collect::<Result<Vec<_>>>();
        self.namespace = enclosing;

        Ok(json!({
            "type": "record",
            "name": schema.name(),
            "fields": fields?,
        }))
    }

    fn schema(&mut self, schema: &Schema) -> Result<Value> {
        let rendered = match schema {
            Schema::Null => json!("null"),
            Schema::Boolean => json!("boolean"),
            Schema::Int => json!("int"),
            Schema::Long => json!("long"),
            Schema::Float => json!("float"),
            Schema::Double => json!("double"),
            Schema::Bytes => json!("bytes"),
            Schema::String => json!("string"),
            Schema::Enum(symbols) => self.enumeration(symbols)?,
            Schema::Array(items) => json!({ "type": "array", "items": self.schema(items)? }),
            Schema::Map { keys, values } => {
                if !matches!(keys.as_ref(), Schema::String) {
                    return Err(TranscodeError::SchemaParse(format!(
                        "map keys must be strings, found {}",
                        keys
                    )));
                }
                json!({ "type": "map", "values": self.schema(values)? })
            }
            Schema::Record(record) => self.nested_record(record)?,
            Schema::Union(branches) => Value::Array(
                branches
                    .iter()
                    .map(|b| self.schema(b))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(rendered)
    }

    fn nested_record(&mut self, record: &Arc<RecordSchema>) -> Result<Value> {
        let fullname = self.qualify(record.name())?;
        match self.defined.get(&fullname) {
            Some(Defined::Record(existing)) if existing.as_ref() == record.as_ref() => {
                return Ok(json!(fullname));
            }
            Some(_) => {
                return Err(TranscodeError::SchemaParse(format!(
                    "name '{}' is defined more than once with different structures",
                    fullname
                )));
            }
            None => {}
        }
        self.defined
            .insert(fullname, Defined::Record(Arc::clone(record)));
        self.record(record)
    }

    fn enumeration(&mut self, symbols: &[String]) -> Result<Value> {
        let name = enum_name(symbols);
        let fullname = self.qualify(&name)?;
        match self.defined.get(&fullname) {
            Some(Defined::Enum(existing)) if existing.as_slice() == symbols => {
                return Ok(json!(fullname));
            }
            Some(_) => {
                return Err(TranscodeError::SchemaParse(format!(
                    "name '{}' is defined more than once with different structures",
                    fullname
                )));
            }
            None => {}
        }
        self.defined
            .insert(fullname, Defined::Enum(symbols.to_vec()));

        Ok(json!({ "type": "enum", "name": name, "symbols": symbols }))
    }

    /// Checks `name` against the Avro name grammar and resolves it against
    /// the enclosing namespace
    fn qualify(&self, name: &str) -> Result<String> {
        if !name.split('.').all(is_avro_identifier) {
            return Err(TranscodeError::SchemaParse(format!(
                "'{}' is not a valid Avro name",
                name
            )));
        }
        Ok(match &self.namespace {
            Some(namespace) if !name.contains('.') => format!("{}.{}", namespace, name),
            _ => name.to_string(),
        })
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_avro_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn namespace_of(fullname: &str) -> Option<String> {
    fullname
        .rsplit_once('.')
        .map(|(namespace, _)| namespace.to_string())
}

/// Deterministic name for an anonymous enum, derived from its symbols
fn enum_name(symbols: &[String]) -> String {
    let mut hasher = Sha256::new();
    for symbol in symbols {
        hasher.update((symbol.len() as u64).to_be_bytes());
        hasher.update(symbol.as_bytes());
    }
    let digest = hasher.finalize();
    format!("enum{}", hex::encode(&digest[..4]))
}

/// An Avro record schema derived from a structured-record schema
///
/// Immutable. Carries a name table so that `Schema::Ref` nodes produced by
/// reused named types can be resolved during value conversion.
#[derive(Debug, Clone)]
pub struct TargetSchema {
    schema: AvroSchema,
    name: String,
    canonical: String,
    fingerprint: String,
    named: HashMap<Name, AvroSchema>,
}

impl TargetSchema {
    pub fn new(schema: AvroSchema) -> Result<Self> {
        let name = match &schema {
            AvroSchema::Record(record) => record.name.fullname(None),
            _ => {
                return Err(TranscodeError::SchemaParse(
                    "top-level schema must be a record".to_string(),
                ))
            }
        };

        let canonical = schema.canonical_form();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let fingerprint = format!("sha256:{}", hex::encode(hasher.finalize()));

        let mut named = HashMap::new();
        collect_named(&schema, &mut named);

        Ok(Self {
            schema,
            name,
            canonical,
            fingerprint,
            named,
        })
    }

    /// Parse an Avro JSON schema supplied by the caller
    pub fn parse_str(raw_schema: &str) -> Result<Self> {
        let schema = AvroSchema::parse_str(raw_schema)
            .map_err(|e| TranscodeError::SchemaParse(format!("invalid Avro schema: {}", e)))?;
        Self::new(schema)
    }

    pub fn avro(&self) -> &AvroSchema {
        &self.schema
    }

    /// Full name of the top-level record, namespace included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level record fields in declared order
    pub fn fields(&self) -> &[RecordField] {
        match &self.schema {
            AvroSchema::Record(record) => &record.fields,
            _ => &[],
        }
    }

    /// Parsing canonical form of the schema
    pub fn canonical_form(&self) -> &str {
        &self.canonical
    }

    /// SHA-256 of the canonical form, `sha256:`-prefixed
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Follows a `Ref` to its named definition
    pub(crate) fn resolve<'a>(&'a self, schema: &'a AvroSchema) -> Option<&'a AvroSchema> {
        match schema {
            AvroSchema::Ref { name } => self.named.get(name),
            other => Some(other),
        }
    }
}

fn collect_named(schema: &AvroSchema, named: &mut HashMap<Name, AvroSchema>) {
    match schema {
        AvroSchema::Record(record) => {
            named.insert(record.name.clone(), schema.clone());
            for field in &record.fields {
                collect_named(&field.schema, named);
            }
        }
        AvroSchema::Enum(enumeration) => {
            named.insert(enumeration.name.clone(), schema.clone());
        }
        AvroSchema::Fixed(fixed) => {
            named.insert(fixed.name.clone(), schema.clone());
        }
        AvroSchema::Array(array) => collect_named(&array.items, named),
        AvroSchema::Map(map) => collect_named(&map.types, named),
        AvroSchema::Union(union) => {
            for variant in union.variants() {
                collect_named(variant, named);
            }
        }
        _ => {}
    }
}
