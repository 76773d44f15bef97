//! Settings error types.

/// Errors raised while loading or merging settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON or does not match the schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is syntactically valid but semantically unusable.
    #[error("invalid setting {field}: {message}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
