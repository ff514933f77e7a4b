//! babelcast - Real-time speech recognition and translation broadcast pipeline
//!
//! Glues a continuous microphone feed to a streaming recognition provider,
//! renders interim vs. final results with bounded buffering, and fans final
//! text out to translation, synthesis, and dual-speaker playback.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod recognition;
pub mod report;
pub mod session;
pub mod speakers;
pub mod stats;
pub mod synthesis;
pub mod translate;

// Core traits (source → recognize → dispatch → translate/speak)
pub use audio::playback::PlaybackDevice;
pub use audio::source::AudioSource;
pub use dispatch::TranscriptSink;
pub use recognition::provider::RecognitionProvider;
pub use synthesis::provider::SynthesisProvider;
pub use translate::provider::TranslationProvider;

// Session orchestration
pub use session::{LiveSession, LiveSessionConfig, SessionHandle, SessionOutcome};

// Error handling
pub use error::{BabelcastError, Result};

// Config
pub use config::Config;

// Stage error reporting (for custom session supervision)
pub use report::{ErrorReporter, LogReporter, StageError};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
