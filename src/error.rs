//! Error types for message compatibility checks

use thiserror::Error;

/// Result type for compatibility operations
pub type Result<T> = std::result::Result<T, ZddError>;

/// Diagnostics raised while checking a snapshot or handling its fixtures
#[derive(Error, Debug)]
pub enum ZddError {
    #[error("Cannot assign {actual} to property {class}::${property} of type {expected}")]
    DecodeTypeViolation {
        class: String,
        property: String,
        actual: String,
        expected: String,
    },

    #[error("Class mismatch between expected class \"{expected}\" and serialized message class \"{actual}\". Please verify your integration.")]
    ClassMismatch { expected: String, actual: String },

    #[error("⚠️ The properties {} in class \"{class}\" seems to have been removed", quoted(.properties))]
    PropertyRemoved { class: String, properties: Vec<String> },

    #[error("Error for property \"{property}\" in class \"{class}\", the type mismatch between the old ({recorded}) and the new ({live}) version of class. Please verify your integration.")]
    TypePropertyMismatch {
        class: String,
        property: String,
        recorded: String,
        live: String,
    },

    #[error("Invalid schema format: {0}")]
    SchemaFormat(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Decode error at byte {offset}: {message}")]
    Decode { offset: usize, message: String },

    #[error("Fixture not found for class {0}")]
    FixtureNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ZddError {
    /// Whether this error reports a breaking change between the snapshot and the live class,
    /// as opposed to an integration or IO failure
    pub fn is_breaking_change(&self) -> bool {
        matches!(
            self,
            ZddError::DecodeTypeViolation { .. }
                | ZddError::ClassMismatch { .. }
                | ZddError::PropertyRemoved { .. }
                | ZddError::TypePropertyMismatch { .. }
        )
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}
