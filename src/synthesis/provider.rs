//! Synthesis provider boundary.

use crate::error::{BabelcastError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Requested voice gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Neutral,
    Male,
    Female,
}

impl Default for VoiceGender {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Request for one synthesis call.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    /// BCP-47 language code for the voice (e.g. "en-US").
    pub language_code: String,
    pub voice_gender: VoiceGender,
}

/// Opaque text-to-speech service. Returns encoded audio bytes (WAV).
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}

/// Synthesis provider speaking JSON over HTTP, returning raw audio bytes.
pub struct HttpSynthesisProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesisProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SynthesisProvider for HttpSynthesisProvider {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let url = format!("{}/synthesize", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BabelcastError::SynthesisUnavailable {
                message: format!("request to {} failed: {}", url, e),
            })?;

        if !response.status().is_success() {
            return Err(BabelcastError::SynthesisUnavailable {
                message: format!("{} returned status {}", url, response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BabelcastError::SynthesisUnavailable {
                message: format!("failed to read audio body: {}", e),
            })?;

        Ok(bytes.to_vec())
    }
}

/// Mock synthesis provider for testing.
///
/// Produces deterministic pseudo-audio derived from the input text.
pub struct MockSynthesisProvider {
    calls: AtomicUsize,
    fail_calls: AtomicUsize,
}

impl MockSynthesisProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` synthesize calls.
    pub fn with_failures(self, n: usize) -> Self {
        self.fail_calls.store(n, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSynthesisProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesisProvider for MockSynthesisProvider {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .fail_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BabelcastError::SynthesisUnavailable {
                message: "mock synthesis failure".to_string(),
            });
        }

        Ok(request.text.bytes().rev().collect())
    }
}
