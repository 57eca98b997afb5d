//! Self-describing structured records
//!
//! A [`StructuredRecord`] carries its own [`RecordSchema`]: an ordered set of
//! named fields, each with a semantic [`Schema`] type. Schemas are immutable,
//! compare structurally and expose a stable structural [`SchemaHash`].

mod error;
mod record;
mod schema;

pub use error::{Result, SchemaError};
pub use record::{FieldValue, RecordBuilder, StructuredRecord};
pub use schema::{Field, RecordSchema, Schema, SchemaHash};
