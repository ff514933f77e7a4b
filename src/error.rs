//! Error types for babelcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BabelcastError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device is busy: {device}")]
    DeviceBusy { device: String },

    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Streaming recognition errors
    #[error("Recognition stream expired: {message}")]
    StreamExpired { message: String },

    #[error("Recognition service unavailable: {message}")]
    RecognitionUnavailable { message: String },

    // Translation errors
    #[error("Translation service unavailable: {message}")]
    TranslationUnavailable { message: String },

    // Synthesis errors
    #[error("Synthesis service unavailable: {message}")]
    SynthesisUnavailable { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BabelcastError>;
