//! Per-field value conversion
//!
//! Dispatches on the declared Avro type of each field. Values must already
//! have the runtime type the schema declares: nothing is widened, narrowed
//! or parsed.

use crate::error::{Result, TranscodeError};
use crate::record::{AvroDatum, GenericRecord};
use crate::translator::TargetSchema;
use apache_avro::schema::{
    Name, RecordSchema as AvroRecordSchema, Schema as AvroSchema, UnionSchema,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use structured_record::{FieldValue, StructuredRecord};

pub(crate) struct Converter<'a> {
    target: &'a TargetSchema,
}

impl<'a> Converter<'a> {
    pub(crate) fn new(target: &'a TargetSchema) -> Self {
        Self { target }
    }

    /// Builds a generic record by walking the Avro fields in declared order
    pub(crate) fn record(
        &self,
        record: &StructuredRecord,
        schema: &AvroRecordSchema,
    ) -> Result<GenericRecord> {
        let namespace = schema.name.namespace.as_deref();
        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = record
                .get(&field.name)
                .ok_or_else(|| TranscodeError::MissingField(field.name.clone()))?;
            let converted = self.value(&field.name, value, &field.schema, namespace)?;
            fields.push((field.name.clone(), converted));
        }
        Ok(GenericRecord::new(schema.name.fullname(None), fields))
    }

    /// `namespace` is the one of the enclosing record; undotted source
    /// record names are resolved against it when picking union branches.
    fn value(
        &self,
        field: &str,
        value: &FieldValue,
        schema: &AvroSchema,
        namespace: Option<&str>,
    ) -> Result<AvroDatum> {
        let schema = self.resolve(field, schema)?;
        match (schema, value) {
            (AvroSchema::Bytes, FieldValue::Buffer(buffer)) => Ok(AvroDatum::Bytes(buffer.clone())),
            (AvroSchema::Bytes, FieldValue::Bytes(raw)) => {
                Ok(AvroDatum::Bytes(Bytes::from_owner(Arc::clone(raw))))
            }

            (AvroSchema::Null, FieldValue::Null) => Ok(AvroDatum::Null),
            (AvroSchema::Boolean, FieldValue::Boolean(v)) => Ok(AvroDatum::Boolean(*v)),
            (AvroSchema::Int, FieldValue::Int(v)) => Ok(AvroDatum::Int(*v)),
            (AvroSchema::Long, FieldValue::Long(v)) => Ok(AvroDatum::Long(*v)),
            (AvroSchema::Float, FieldValue::Float(v)) => Ok(AvroDatum::Float(*v)),
            (AvroSchema::Double, FieldValue::Double(v)) => Ok(AvroDatum::Double(*v)),
            (AvroSchema::String, FieldValue::String(v)) => Ok(AvroDatum::String(v.clone())),

            (AvroSchema::Enum(enumeration), FieldValue::Enum(symbol)) => enumeration
                .symbols
                .iter()
                .position(|s| s == symbol)
                .map(|index| AvroDatum::Enum(index as u32, symbol.clone()))
                .ok_or_else(|| TranscodeError::ValueTypeMismatch {
                    field: field.to_string(),
                    expected: format!("one of [{}]", enumeration.symbols.join(", ")),
                    found: value.type_name(),
                }),

            (AvroSchema::Record(nested), FieldValue::Record(record)) => {
                self.record(record, nested).map(AvroDatum::Record)
            }

            (AvroSchema::Array(array), FieldValue::Array(items)) => items
                .iter()
                .map(|item| self.value(field, item, &array.items, namespace))
                .collect::<Result<Vec<_>>>()
                .map(AvroDatum::Array),

            (AvroSchema::Map(map), FieldValue::Map(entries)) => entries
                .iter()
                .map(|(key, item)| -> Result<(String, AvroDatum)> {
                    Ok((key.clone(), self.value(field, item, &map.types, namespace)?))
                })
                .collect::<Result<HashMap<_, _>>>()
                .map(AvroDatum::Map),

            (AvroSchema::Union(union), _) => self.union(field, value, union, namespace),

            (
                AvroSchema::Null
                | AvroSchema::Boolean
                | AvroSchema::Int
                | AvroSchema::Long
                | AvroSchema::Float
                | AvroSchema::Double
                | AvroSchema::Bytes
                | AvroSchema::String
                | AvroSchema::Enum(_)
                | AvroSchema::Record(_)
                | AvroSchema::Array(_)
                | AvroSchema::Map(_),
                _,
            ) => Err(mismatch(field, schema, value)),

            (other, _) => Err(TranscodeError::UnsupportedType {
                field: field.to_string(),
                target: type_label(other),
            }),
        }
    }

    /// Null goes to the null branch; anything else to the first non-null
    /// branch whose kind accepts the value.
    fn union(
        &self,
        field: &str,
        value: &FieldValue,
        union: &UnionSchema,
        namespace: Option<&str>,
    ) -> Result<AvroDatum> {
        for (index, variant) in union.variants().iter().enumerate() {
            let variant = self.resolve(field, variant)?;
            if value.is_null() != matches!(variant, AvroSchema::Null) {
                continue;
            }
            if accepts(variant, value, namespace) {
                let converted = self.value(field, value, variant, namespace)?;
                return Ok(AvroDatum::Union(index as u32, Box::new(converted)));
            }
        }

        let branches: Vec<String> = union.variants().iter().map(type_label).collect();
        Err(TranscodeError::ValueTypeMismatch {
            field: field.to_string(),
            expected: format!("union[{}]", branches.join(", ")),
            found: value.type_name(),
        })
    }

    fn resolve<'s>(&'s self, field: &str, schema: &'s AvroSchema) -> Result<&'s AvroSchema> {
        self.target
            .resolve(schema)
            .ok_or_else(|| TranscodeError::UnsupportedType {
                field: field.to_string(),
                target: type_label(schema),
            })
    }
}

/// Shallow kind check used to pick a union branch
fn accepts(schema: &AvroSchema, value: &FieldValue, namespace: Option<&str>) -> bool {
    match (schema, value) {
        (AvroSchema::Null, FieldValue::Null)
        | (AvroSchema::Boolean, FieldValue::Boolean(_))
        | (AvroSchema::Int, FieldValue::Int(_))
        | (AvroSchema::Long, FieldValue::Long(_))
        | (AvroSchema::Float, FieldValue::Float(_))
        | (AvroSchema::Double, FieldValue::Double(_))
        | (AvroSchema::String, FieldValue::String(_))
        | (AvroSchema::Bytes, FieldValue::Bytes(_) | FieldValue::Buffer(_))
        | (AvroSchema::Array(_), FieldValue::Array(_))
        | (AvroSchema::Map(_), FieldValue::Map(_)) => true,
        (AvroSchema::Enum(enumeration), FieldValue::Enum(symbol)) => {
            enumeration.symbols.contains(symbol)
        }
        (AvroSchema::Record(nested), FieldValue::Record(record)) => {
            match Name::new(record.schema().name()) {
                Ok(source) => {
                    source.fullname(namespace.map(str::to_string)) == nested.name.fullname(None)
                }
                Err(_) => false,
            }
        }
        _ => false,
    }
}

fn mismatch(field: &str, schema: &AvroSchema, value: &FieldValue) -> TranscodeError {
    TranscodeError::ValueTypeMismatch {
        field: field.to_string(),
        expected: type_label(schema),
        found: value.type_name(),
    }
}

/// Short human readable name of an Avro type
fn type_label(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Null => "null".to_string(),
        AvroSchema::Boolean => "boolean".to_string(),
        AvroSchema::Int => "int".to_string(),
        AvroSchema::Long => "long".to_string(),
        AvroSchema::Float => "float".to_string(),
        AvroSchema::Double => "double".to_string(),
        AvroSchema::Bytes => "bytes".to_string(),
        AvroSchema::String => "string".to_string(),
        AvroSchema::Enum(enumeration) => format!("enum {}", enumeration.name.fullname(None)),
        AvroSchema::Record(record) => format!("record {}", record.name.fullname(None)),
        AvroSchema::Array(array) => format!("array<{}>", type_label(&array.items)),
        AvroSchema::Map(map) => format!("map<{}>", type_label(&map.types)),
        AvroSchema::Union(union) => {
            let branches: Vec<String> = union.variants().iter().map(type_label).collect();
            format!("union[{}]", branches.join(", "))
        }
        AvroSchema::Ref { name } => name.fullname(None),
        other => serde_json::to_string(other).unwrap_or_else(|_| "unknown".to_string()),
    }
}
