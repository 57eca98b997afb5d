//! Schema-driven transcoding of structured records into Avro
//!
//! [`RecordTranscoder::transform`] takes a [`StructuredRecord`] whose schema
//! is only known at runtime, derives the matching Avro schema, converts every
//! field value and returns a [`TranscodedRecord`]. Derived schemas are cached
//! per distinct source schema, so a stream of records sharing one schema
//! pays for schema parsing once.
//!
//! [`StructuredRecord`]: structured_record::StructuredRecord

mod cache;
mod config;
mod convert;
mod error;
mod record;
mod transcoder;
mod translator;
mod types;
mod validator;

pub use cache::{CacheStats, SchemaCache};
pub use config::TranscoderConfig;
pub use error::{Result, TranscodeError};
pub use record::{AvroDatum, GenericRecord, TranscodedRecord};
pub use transcoder::RecordTranscoder;
pub use translator::{AvroSchemaTranslator, SchemaTranslator, TargetSchema};
pub use types::ValidationPolicy;
