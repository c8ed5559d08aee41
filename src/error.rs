//! Error handling for the subliminal mixer
//!
//! Decode-boundary errors (missing file, bad container, empty track) reach the
//! caller as-is. Anything that goes wrong once processing has started is logged
//! in full and collapsed into the opaque [`SubliminalError::ProcessingFailure`].

use thiserror::Error;

/// Result type alias for subliminal operations
pub type Result<T> = std::result::Result<T, SubliminalError>;

/// Main error type for subliminal operations
#[derive(Error, Debug)]
pub enum SubliminalError {
    // Input Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidFormat {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("The {track} track contains no audio")]
    EmptyInput { track: String },

    // Configuration Errors
    #[error("Invalid setting {field} = {value} (allowed range {min} to {max})")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    // Processing Errors
    #[error("Processing error: {reason}")]
    Processing { reason: String },

    #[error("An error occurred while processing the audio")]
    ProcessingFailure,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SubliminalError {
    /// Shorthand for an internal stage error
    pub fn processing(reason: impl Into<String>) -> Self {
        SubliminalError::Processing {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SubliminalError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SubliminalError::InvalidFormat { .. } => "INVALID_FORMAT",
            SubliminalError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SubliminalError::EmptyInput { .. } => "EMPTY_INPUT",
            SubliminalError::InvalidConfig { .. } => "INVALID_CONFIG",
            SubliminalError::Processing { .. } => "PROCESSING_ERROR",
            SubliminalError::ProcessingFailure => "PROCESSING_FAILURE",
            SubliminalError::Io(_) => "IO_ERROR",
            SubliminalError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check whether the caller can fix the problem and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SubliminalError::FileNotFound { .. }
                | SubliminalError::InvalidFormat { .. }
                | SubliminalError::UnsupportedFormat { .. }
                | SubliminalError::EmptyInput { .. }
                | SubliminalError::InvalidConfig { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SubliminalError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            SubliminalError::InvalidFormat { .. } => vec![
                "Try converting the file to WAV format first",
                "The file may be corrupted - try re-exporting from source",
            ],
            SubliminalError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV file",
                "Supported sample formats: 8/16/24/32-bit integer, 32-bit float",
            ],
            SubliminalError::EmptyInput { .. } => vec![
                "Record a longer affirmation",
                "Pick a background track that actually contains audio",
            ],
            SubliminalError::InvalidConfig { .. } => vec![
                "Run 'subliminal-cli limits' to see the allowed ranges",
            ],
            SubliminalError::ProcessingFailure => vec![
                "Try again with different input files",
                "Check the log for details",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            SubliminalError::EmptyInput { track } => {
                format!("The {} audio is empty. Please choose a file with sound in it.", track)
            }
            SubliminalError::InvalidConfig {
                field, min, max, ..
            } => {
                format!("'{}' must be between {} and {}.", field, min, max)
            }
            SubliminalError::ProcessingFailure | SubliminalError::Processing { .. } => {
                "Something went wrong while mixing the audio.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
