//! Data types for streaming recognition.

use crate::defaults;
use std::time::{Duration, Instant};

/// One recognition output, interim or final.
///
/// Events arrive strictly in provider order; a later event for the same
/// utterance supersedes any earlier interim. At most one final event is
/// emitted per utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    /// Recognized text.
    pub text: String,
    /// True once the provider guarantees this text will not change.
    pub is_final: bool,
    /// Confidence in [0, 1]; absent for interim results.
    pub confidence: Option<f32>,
    /// Monotonic sequence number stamped by the client across the whole
    /// session, including provider stream restarts.
    pub sequence: u64,
    /// When the event was received.
    pub timestamp: Instant,
}

impl RecognitionEvent {
    /// Creates an interim (provisional) event.
    pub fn interim(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: false,
            confidence: None,
            sequence: 0,
            timestamp: Instant::now(),
        }
    }

    /// Creates a final event with a confidence score.
    pub fn finalized(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            is_final: true,
            confidence: Some(confidence),
            sequence: 0,
            timestamp: Instant::now(),
        }
    }
}

/// Events flowing out of one provider stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A recognition result (interim or final).
    Recognition(RecognitionEvent),
    /// The provider-imposed session duration limit was reached.
    Expired,
    /// The provider closed the stream after end-of-input.
    Closed,
    /// Transport-level failure.
    Error(String),
}

/// Configuration for a streaming recognition session.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// BCP-47 language code for recognition (e.g. "en-US").
    pub language: String,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Whether the provider should emit interim results.
    pub interim_results: bool,
    /// Proactive stream rotation interval, kept under the provider limit.
    pub max_stream_duration: Duration,
    /// Reconnect attempts before the session is declared dead.
    pub max_retries: u32,
    /// Base reconnect delay; doubles on each attempt.
    pub retry_backoff: Duration,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: defaults::RECOGNITION_LANGUAGE.to_string(),
            sample_rate: defaults::SAMPLE_RATE,
            interim_results: true,
            max_stream_duration: defaults::MAX_STREAM_DURATION,
            max_retries: defaults::MAX_RECONNECT_ATTEMPTS,
            retry_backoff: defaults::RECONNECT_BACKOFF,
        }
    }
}

/// Lifecycle of a streaming recognition client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    Idle,
    Streaming,
    Stopped,
    Error,
}
