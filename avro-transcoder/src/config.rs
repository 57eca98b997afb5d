use crate::error::{Result, TranscodeError};
use crate::types::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

const DEFAULT_CACHE_WARN_THRESHOLD: usize = 1024;

/// Transcoder settings, usually loaded from a YAML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Validation of each transcoded record against its Avro schema
    pub validation_policy: ValidationPolicy,
    /// Number of cached schemas after which growth is logged as a warning.
    /// The cache never evicts; 0 disables the warning.
    pub cache_warn_threshold: usize,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            validation_policy: ValidationPolicy::default(),
            cache_warn_threshold: DEFAULT_CACHE_WARN_THRESHOLD,
        }
    }
}

impl TranscoderConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| TranscodeError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            TranscodeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }
}
