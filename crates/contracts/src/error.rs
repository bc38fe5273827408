//! Layered error definitions
//!
//! Categorized by source: config / host / bus / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Host Errors =====
    /// Messaging runtime was not started before the plugin was loaded
    #[error("messaging runtime not initialized: {message}")]
    RuntimeNotInitialized { message: String },

    // ===== Bus Errors =====
    /// Topic advertisement failed
    #[error("failed to advertise topic '{topic}': {message}")]
    Advertise { topic: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create runtime-not-initialized error
    pub fn runtime_not_initialized(message: impl Into<String>) -> Self {
        Self::RuntimeNotInitialized {
            message: message.into(),
        }
    }

    /// Create advertise error
    pub fn advertise(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Advertise {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from configuration (parse or validation)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}
