use crate::cache::SchemaCache;
use crate::config::TranscoderConfig;
use crate::convert::Converter;
use crate::error::{Result, TranscodeError};
use crate::record::TranscodedRecord;
use crate::translator::{AvroSchemaTranslator, SchemaTranslator, TargetSchema};
use crate::types::ValidationPolicy;
use crate::validator::OutputValidator;
use apache_avro::schema::Schema as AvroSchema;
use std::sync::Arc;
use structured_record::StructuredRecord;

/// Converts structured records into Avro generic records
///
/// The Avro schema is derived from each record's own schema and memoized in
/// a cache owned by this instance. One transcoder can be shared across
/// threads; create a new one per job to release cached schemas.
#[derive(Debug)]
pub struct RecordTranscoder {
    cache: SchemaCache,
    validator: OutputValidator,
}

impl RecordTranscoder {
    pub fn new() -> Self {
        Self::with_config(TranscoderConfig::default())
    }

    pub fn with_config(config: TranscoderConfig) -> Self {
        Self::with_translator(config, Arc::new(AvroSchemaTranslator::new()))
    }

    pub fn with_translator(
        config: TranscoderConfig,
        translator: Arc<dyn SchemaTranslator>,
    ) -> Self {
        Self {
            cache: SchemaCache::new(translator, config.cache_warn_threshold),
            validator: OutputValidator::new(config.validation_policy),
        }
    }

    /// Transcodes `record` against the schema derived from its own schema
    pub fn transform(&self, record: &StructuredRecord) -> Result<TranscodedRecord> {
        self.transform_with(record, None)
    }

    /// Transcodes `record`, against `target` when given instead of the
    /// derived schema
    ///
    /// Every field of the target schema must be declared by the record's
    /// schema, otherwise the call fails with [`TranscodeError::MissingField`].
    /// Nothing is returned on failure, not even a partial record.
    pub fn transform_with(
        &self,
        record: &StructuredRecord,
        target: Option<Arc<TargetSchema>>,
    ) -> Result<TranscodedRecord> {
        let source = record.schema();
        let target = match target {
            Some(target) => target,
            None => self.cache.resolve(source)?,
        };

        let AvroSchema::Record(root) = target.avro() else {
            return Err(TranscodeError::UnsupportedType {
                field: source.name().to_string(),
                target: "non-record schema".to_string(),
            });
        };
        let converted = Converter::new(&target).record(record, root)?;
        self.validator.check(&converted, &target)?;

        Ok(TranscodedRecord::new(converted, target, source.fingerprint()))
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        self.validator.policy()
    }
}

impl Default for RecordTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AvroDatum;
    use structured_record::{Field, RecordSchema, Schema};

    fn user_schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new(
                "User",
                vec![Field::new("id", Schema::Int), Field::new("name", Schema::String)],
            )
            .unwrap(),
        )
    }

    fn user(schema: &Arc<RecordSchema>, id: i32, name: &str) -> StructuredRecord {
        StructuredRecord::builder(Arc::clone(schema))
            .set("id", id)
            .unwrap()
            .set("name", name)
            .unwrap()
            .build()
    }

    #[test]
    fn test_transform_tags_output_with_source_hash() {
        let transcoder = RecordTranscoder::new();
        let schema = user_schema();
        let output = transcoder.transform(&user(&schema, 7, "alice")).unwrap();

        assert_eq!(output.source_hash(), schema.fingerprint());
        assert_eq!(output.schema().name(), "User");
        assert_eq!(output.get("id"), Some(&AvroDatum::Int(7)));
        assert_eq!(output.get("name"), Some(&AvroDatum::String("alice".to_string())));
    }

    #[test]
    fn test_explicit_target_bypasses_cache() {
        let transcoder = RecordTranscoder::new();
        let target = Arc::new(AvroSchemaTranslator::new().translate(&user_schema()).unwrap());

        let output = transcoder
            .transform_with(&user(&user_schema(), 1, "a"), Some(Arc::clone(&target)))
            .unwrap();

        assert!(Arc::ptr_eq(output.schema(), &target));
        assert!(transcoder.cache().is_empty());
    }

    #[test]
    fn test_schema_parse_error_propagates() {
        let schema = Arc::new(
            RecordSchema::new("bad-name", vec![Field::new("id", Schema::Int)]).unwrap(),
        );
        let record = StructuredRecord::builder(schema)
            .set("id", 1)
            .unwrap()
            .build();

        let err = RecordTranscoder::new().transform(&record).unwrap_err();
        assert!(matches!(err, TranscodeError::SchemaParse(_)));
    }

    #[test]
    fn test_invalid_nested_record_name_is_a_parse_error() {
        let nested =
            RecordSchema::new("my-addr", vec![Field::new("city", Schema::String)]).unwrap();
        let schema = Arc::new(
            RecordSchema::new("User", vec![Field::new("home", Schema::record(nested.clone()))])
                .unwrap(),
        );
        let home = StructuredRecord::builder(Arc::new(nested))
            .set("city", "Oslo")
            .unwrap()
            .build();
        let record = StructuredRecord::builder(schema)
            .set("home", home)
            .unwrap()
            .build();

        let transcoder = RecordTranscoder::new();
        let err = transcoder.transform(&record).unwrap_err();
        assert!(matches!(err, TranscodeError::SchemaParse(_)));
        assert!(transcoder.cache().is_empty());
    }

    #[test]
    fn test_namespaced_output_keeps_full_names() {
        let config = TranscoderConfig::default().with_validation_policy(ValidationPolicy::Enforce);
        let transcoder = RecordTranscoder::with_config(config);
        let address = Arc::new(
            RecordSchema::new("Address", vec![Field::new("city", Schema::String)]).unwrap(),
        );
        let order = Arc::new(
            RecordSchema::new(
                "com.acme.Order",
                vec![Field::new("bill_to", Schema::nullable(Schema::Record(Arc::clone(&address))))],
            )
            .unwrap(),
        );
        let bill_to = StructuredRecord::builder(address)
            .set("city", "Lisbon")
            .unwrap()
            .build();
        let record = StructuredRecord::builder(order)
            .set("bill_to", bill_to)
            .unwrap()
            .build();

        let output = transcoder.transform(&record).unwrap();
        assert_eq!(output.schema().name(), "com.acme.Order");
        assert_eq!(output.record().name(), "com.acme.Order");
        assert!(!output.encode().unwrap().is_empty());
    }

    #[test]
    fn test_config_policy_is_applied() {
        let config = TranscoderConfig::default().with_validation_policy(ValidationPolicy::Enforce);
        let transcoder = RecordTranscoder::with_config(config);
        assert_eq!(transcoder.validation_policy(), ValidationPolicy::Enforce);

        let schema = user_schema();
        assert!(transcoder.transform(&user(&schema, 2, "bob")).is_ok());
    }
}
