//! Error handling for Auralab
//!
//! Every failure aborts the current run. Errors carry a stable code and a
//! few recovery suggestions for the CLI to print.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Auralab operations
pub type Result<T> = std::result::Result<T, AuralabError>;

/// Main error type for Auralab operations
#[derive(Error, Debug)]
pub enum AuralabError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to write {}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Parameter Errors
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    // Rendering Errors
    #[error("Waveform rendering failed: {reason}")]
    Render { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuralabError {
    /// Shorthand for an [`AuralabError::InvalidParameter`]
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        AuralabError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AuralabError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AuralabError::FileWrite { .. } => "FILE_WRITE",
            AuralabError::InvalidAudio { .. } => "INVALID_AUDIO",
            AuralabError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AuralabError::EmptyAudio => "EMPTY_AUDIO",
            AuralabError::InvalidParameter { .. } => "INVALID_PARAMETER",
            AuralabError::Render { .. } => "RENDER_ERROR",
            AuralabError::Io(_) => "IO_ERROR",
            AuralabError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AuralabError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            AuralabError::FileWrite { .. } => vec![
                "Check the work directory is writable",
                "Free up disk space",
            ],
            AuralabError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "Try converting the file to WAV or MP3 first",
            ],
            AuralabError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV or MP3 file",
                "Supported bit depths: 8, 16, 24, 32",
            ],
            AuralabError::InvalidParameter { .. } => vec![
                "Tempo rates must be positive numbers",
                "Check the values in the experiment config file",
            ],
            _ => vec![],
        }
    }
}
