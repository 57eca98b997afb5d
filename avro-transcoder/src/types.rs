use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a transcoded record fails validation against its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ValidationPolicy {
    /// No validation
    None,
    /// Validate and log warnings
    Warn,
    /// Validate and reject invalid records
    Enforce,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy::None
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::None => write!(f, "none"),
            ValidationPolicy::Warn => write!(f, "warn"),
            ValidationPolicy::Enforce => write!(f, "enforce"),
        }
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ValidationPolicy::None),
            "warn" => Ok(ValidationPolicy::Warn),
            "enforce" => Ok(ValidationPolicy::Enforce),
            other => Err(format!("unknown validation policy: '{}'", other)),
        }
    }
}

impl TryFrom<String> for ValidationPolicy {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}
