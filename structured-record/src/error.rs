use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema and field names must not be empty")]
    EmptyName,

    #[error("record '{0}' declares no fields")]
    NoFields(String),

    #[error("record '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },

    #[error("record '{record}' has no field named '{field}'")]
    UnknownField { record: String, field: String },
}
