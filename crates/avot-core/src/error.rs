use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvotError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Execution errors
    #[error("Cycle detected at node '{node}'")]
    Cycle { node: String },

    #[error("Capability call failed: {capability}: {message}")]
    Capability { capability: String, message: String },

    #[error("Execution cancelled")]
    Cancelled,

    // Council errors
    #[error("Council result invariant violated: {0}")]
    Invariant(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AvotError {
    pub fn capability(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AvotError>;
