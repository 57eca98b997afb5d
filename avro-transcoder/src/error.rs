use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscodeError>;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("unable to derive Avro schema: {0}")]
    SchemaParse(String),

    #[error("input record does not contain the {0} field")]
    MissingField(String),

    #[error("field '{field}': expected {expected}, found {found}")]
    ValueTypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("field '{field}': no conversion for target type {target}")]
    UnsupportedType { field: String, target: String },

    #[error("transcoded record does not conform to its schema: {0}")]
    InvalidOutput(String),

    #[error("avro encoding error: {0}")]
    Encode(#[from] apache_avro::Error),

    #[error("invalid transcoder configuration: {0}")]
    Config(String),
}

impl TranscodeError {
    /// Name of the offending field, when the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            TranscodeError::MissingField(field)
            | TranscodeError::ValueTypeMismatch { field, .. }
            | TranscodeError::UnsupportedType { field, .. } => Some(field),
            _ => None,
        }
    }
}
