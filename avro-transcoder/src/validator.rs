use crate::error::{Result, TranscodeError};
use crate::record::GenericRecord;
use crate::translator::TargetSchema;
use crate::types::ValidationPolicy;
use tracing::warn;

/// Checks transcoded records against their Avro schema
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputValidator {
    policy: ValidationPolicy,
}

impl OutputValidator {
    pub(crate) fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub(crate) fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub(crate) fn check(&self, record: &GenericRecord, schema: &TargetSchema) -> Result<()> {
        if matches!(self.policy, ValidationPolicy::None) {
            return Ok(());
        }

        if record.clone().into_value().validate(schema.avro()) {
            return Ok(());
        }

        let message = format!(
            "record '{}' does not match schema {}",
            record.name(),
            schema.fingerprint()
        );
        match self.policy {
            ValidationPolicy::Enforce => Err(TranscodeError::InvalidOutput(message)),
            _ => {
                warn!(schema = %schema.name(), "{}", message);
                Ok(())
            }
        }
    }
}
