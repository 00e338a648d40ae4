use thiserror::Error;

/// Custom error type for Mnemos operations.
#[derive(Debug, Error)]
pub enum MnemosError {
    /// Input validation failed (e.g. missing subject id).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested item was not found.
    #[error("Not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    /// A worker or upstream collaborator failed.
    #[error("{stage} failed: {message}")]
    Upstream {
        stage: String,
        message: String,
        /// Transient failures (rate limits, timeouts, 5xx) may be retried.
        retryable: bool,
    },

    /// Long-term store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Reading or writing a persisted document failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

impl MnemosError {
    /// Shorthand for a transient upstream failure.
    pub fn retryable(stage: impl Into<String>, message: impl Into<String>) -> Self {
        MnemosError::Upstream {
            stage: stage.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Shorthand for a permanent upstream failure.
    pub fn upstream(stage: impl Into<String>, message: impl Into<String>) -> Self {
        MnemosError::Upstream {
            stage: stage.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MnemosError::Upstream {
                retryable: true,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for MnemosError {
    fn from(err: serde_json::Error) -> Self {
        MnemosError::Persistence(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml_ng::Error> for MnemosError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        MnemosError::Persistence(format!("YAML serialization error: {}", err))
    }
}

impl From<toml::de::Error> for MnemosError {
    fn from(err: toml::de::Error) -> Self {
        MnemosError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for MnemosError {
    fn from(err: std::io::Error) -> Self {
        MnemosError::Persistence(format!("I/O error: {}", err))
    }
}
