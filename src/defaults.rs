//! Default configuration constants for babelcast.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16_000;

/// Number of PCM samples per audio frame.
///
/// 1024 samples at 16kHz is 64ms of audio — small enough for responsive
/// interim results, large enough to keep per-frame overhead low.
pub const FRAME_SAMPLES: usize = 1024;

/// Number of audio channels (mono).
pub const CHANNELS: u16 = 1;

/// Default frame queue capacity.
///
/// Roughly two seconds of audio at the default frame size. Under backpressure
/// the queue drops its oldest frame; stale audio is useless for live speech.
pub const FRAME_QUEUE_CAPACITY: usize = 32;

/// Maximum duration of one recognition stream before a proactive restart.
///
/// Cloud streaming recognition sessions are capped at about five minutes.
/// Rotating slightly before that keeps the restart invisible to consumers.
pub const MAX_STREAM_DURATION: Duration = Duration::from_secs(290);

/// Maximum reconnect attempts before a recognition session is declared dead.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Base delay between reconnect attempts. Doubles on each retry.
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(250);

/// How long to wait for trailing recognition events after end-of-input.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the bounded translation cache.
pub const TRANSLATION_CACHE_CAPACITY: usize = 1024;

/// Maximum retries for a single translation or synthesis request.
pub const REQUEST_MAX_RETRIES: u32 = 2;

/// Base delay between request retries. Doubles on each retry.
pub const REQUEST_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Default number of text chunks batched per streaming translation call.
pub const TRANSLATION_BATCH_SIZE: usize = 1;

/// Default recognition language code.
pub const RECOGNITION_LANGUAGE: &str = "en-US";

/// Default source language for translation.
pub const SOURCE_LANGUAGE: &str = "en";

/// Default target language for translation.
pub const TARGET_LANGUAGE: &str = "es";

/// Capacity of the channels carrying frames and events between stages.
pub const CHANNEL_CAPACITY: usize = 64;
