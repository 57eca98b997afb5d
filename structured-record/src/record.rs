use crate::error::{Result, SchemaError};
use crate::schema::RecordSchema;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

/// Dynamically typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Raw byte sequence
    Bytes(Arc<[u8]>),
    /// Zero-copy view over bytes owned elsewhere
    Buffer(Bytes),
    /// Enum symbol
    Enum(String),
    Array(Vec<FieldValue>),
    Map(HashMap<String, FieldValue>),
    Record(StructuredRecord),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Name of the runtime type, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Float(_) => "float",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Buffer(_) => "buffer",
            FieldValue::Enum(_) => "enum",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
            FieldValue::Record(_) => "record",
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Long(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(Arc::from(value))
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        FieldValue::Buffer(value)
    }
}

impl From<StructuredRecord> for FieldValue {
    fn from(value: StructuredRecord) -> Self {
        FieldValue::Record(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A record that carries its own schema
///
/// Values are stored in schema field order. A declared field that was never
/// set reads back as [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecord {
    schema: Arc<RecordSchema>,
    values: Vec<FieldValue>,
}

impl StructuredRecord {
    pub fn builder(schema: Arc<RecordSchema>) -> RecordBuilder {
        RecordBuilder::new(schema)
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Value of a declared field, `None` when the schema has no such field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema.position(name).map(|i| &self.values[i])
    }

    /// `(field name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name())
            .zip(self.values.iter())
    }
}

/// Builder for [`StructuredRecord`]
#[derive(Debug)]
pub struct RecordBuilder {
    schema: Arc<RecordSchema>,
    values: Vec<FieldValue>,
}

impl RecordBuilder {
    fn new(schema: Arc<RecordSchema>) -> Self {
        let values = vec![FieldValue::Null; schema.fields().len()];
        Self { schema, values }
    }

    pub fn set(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self> {
        let position = self
            .schema
            .position(name)
            .ok_or_else(|| SchemaError::UnknownField {
                record: self.schema.name().to_string(),
                field: name.to_string(),
            })?;
        self.values[position] = value.into();
        Ok(self)
    }

    pub fn build(self) -> StructuredRecord {
        StructuredRecord {
            schema: self.schema,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};

    fn user_schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new(
                "User",
                vec![
                    Field::new("id", Schema::Int),
                    Field::new("email", Schema::nullable(Schema::String)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_builder_sets_declared_fields() {
        let record = StructuredRecord::builder(user_schema())
            .set("id", 7)
            .unwrap()
            .set("email", "a@example.com")
            .unwrap()
            .build();

        assert_eq!(record.get("id"), Some(&FieldValue::Int(7)));
        assert_eq!(
            record.get("email"),
            Some(&FieldValue::String("a@example.com".to_string()))
        );
        assert_eq!(record.get("age"), None);
    }

    #[test]
    fn test_unset_field_reads_as_null() {
        let record = StructuredRecord::builder(user_schema())
            .set("id", 1)
            .unwrap()
            .build();
        assert_eq!(record.get("email"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_builder_rejects_unknown_field() {
        let err = StructuredRecord::builder(user_schema())
            .set("age", 30)
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                record: "User".to_string(),
                field: "age".to_string()
            }
        );
    }

    #[test]
    fn test_iter_follows_schema_order() {
        let record = StructuredRecord::builder(user_schema())
            .set("email", Option::<String>::None)
            .unwrap()
            .set("id", 3)
            .unwrap()
            .build();
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "email"]);
    }

    #[test]
    fn test_raw_bytes_and_buffer_are_distinct_kinds() {
        let raw = FieldValue::from(vec![1u8, 2]);
        let view = FieldValue::from(Bytes::from_static(&[1, 2]));
        assert_eq!(raw.type_name(), "bytes");
        assert_eq!(view.type_name(), "buffer");
    }
}
