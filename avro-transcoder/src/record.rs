use crate::error::Result;
use crate::translator::TargetSchema;
use apache_avro::types::Value;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use structured_record::SchemaHash;

/// A value in Avro's generic data model
///
/// Byte payloads are kept as [`Bytes`] views so that transcoding never
/// duplicates them; the copy into `apache_avro` values happens only when a
/// record is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroDatum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    String(String),
    /// Symbol index and symbol
    Enum(u32, String),
    Array(Vec<AvroDatum>),
    Map(HashMap<String, AvroDatum>),
    /// Branch index and the branch value
    Union(u32, Box<AvroDatum>),
    Record(GenericRecord),
}

impl AvroDatum {
    pub fn into_value(self) -> Value {
        match self {
            AvroDatum::Null => Value::Null,
            AvroDatum::Boolean(v) => Value::Boolean(v),
            AvroDatum::Int(v) => Value::Int(v),
            AvroDatum::Long(v) => Value::Long(v),
            AvroDatum::Float(v) => Value::Float(v),
            AvroDatum::Double(v) => Value::Double(v),
            AvroDatum::Bytes(v) => Value::Bytes(v.to_vec()),
            AvroDatum::String(v) => Value::String(v),
            AvroDatum::Enum(index, symbol) => Value::Enum(index, symbol),
            AvroDatum::Array(items) => {
                Value::Array(items.into_iter().map(AvroDatum::into_value).collect())
            }
            AvroDatum::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect(),
            ),
            AvroDatum::Union(index, value) => Value::Union(index, Box::new(value.into_value())),
            AvroDatum::Record(record) => record.into_value(),
        }
    }
}

/// Field values of one Avro record, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    name: String,
    fields: Vec<(String, AvroDatum)>,
}

impl GenericRecord {
    pub(crate) fn new(name: String, fields: Vec<(String, AvroDatum)>) -> Self {
        Self { name, fields }
    }

    /// Full Avro record name, namespace included
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, AvroDatum)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&AvroDatum> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn into_value(self) -> Value {
        Value::Record(
            self.fields
                .into_iter()
                .map(|(name, value)| (name, value.into_value()))
                .collect(),
        )
    }
}

/// Output of a transcoding call
///
/// Pairs the generic record with the schema it conforms to and the
/// structural hash of the source schema, so that consumers of a stream can
/// spot schema changes between records without deriving anything.
#[derive(Debug, Clone)]
pub struct TranscodedRecord {
    record: GenericRecord,
    schema: Arc<TargetSchema>,
    source_hash: SchemaHash,
}

impl TranscodedRecord {
    pub(crate) fn new(
        record: GenericRecord,
        schema: Arc<TargetSchema>,
        source_hash: SchemaHash,
    ) -> Self {
        Self {
            record,
            schema,
            source_hash,
        }
    }

    pub fn record(&self) -> &GenericRecord {
        &self.record
    }

    pub fn schema(&self) -> &Arc<TargetSchema> {
        &self.schema
    }

    pub fn source_hash(&self) -> SchemaHash {
        self.source_hash
    }

    pub fn get(&self, name: &str) -> Option<&AvroDatum> {
        self.record.get(name)
    }

    pub fn into_record(self) -> GenericRecord {
        self.record
    }

    /// Copies the record into an `apache_avro` value
    pub fn to_avro_value(&self) -> Value {
        self.record.clone().into_value()
    }

    /// Avro binary encoding of the record (single datum, no container header)
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(apache_avro::to_avro_datum(
            self.schema.avro(),
            self.to_avro_value(),
        )?)
    }
}
