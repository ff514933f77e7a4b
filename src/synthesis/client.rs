//! Synthesis client: retries, playback composition, and dual-speaker output.

use crate::audio::playback::{PlaybackDevice, PlaybackHandle, play_dual};
use crate::defaults;
use crate::error::{BabelcastError, Result};
use crate::stats::ServiceStats;
use crate::synthesis::provider::{SynthesisProvider, SynthesisRequest, VoiceGender};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the synthesis client.
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Default voice language (BCP-47).
    pub language_code: String,
    pub voice_gender: VoiceGender,
    pub max_retries: u32,
    /// Base retry delay; doubles on each attempt.
    pub retry_backoff: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            language_code: defaults::RECOGNITION_LANGUAGE.to_string(),
            voice_gender: VoiceGender::Neutral,
            max_retries: defaults::REQUEST_MAX_RETRIES,
            retry_backoff: defaults::REQUEST_RETRY_BACKOFF,
        }
    }
}

/// Client over an opaque synthesis provider.
pub struct SynthesisClient {
    provider: Arc<dyn SynthesisProvider>,
    config: SynthesisConfig,
    stats: Arc<ServiceStats>,
}

impl SynthesisClient {
    pub fn new(provider: Arc<dyn SynthesisProvider>, config: SynthesisConfig) -> Self {
        Self {
            provider,
            config,
            stats: Arc::new(ServiceStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<ServiceStats> {
        Arc::clone(&self.stats)
    }

    /// Synthesizes text to audio bytes with bounded retries.
    pub async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_gender: VoiceGender,
    ) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text: text.to_string(),
            language_code: language_code.to_string(),
            voice_gender,
        };

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.provider.synthesize(&request).await {
                Ok(audio) => {
                    self.stats.record_success(started.elapsed());
                    return Ok(audio);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        self.stats.record_failure();
                        return Err(BabelcastError::SynthesisUnavailable {
                            message: format!("failed after {} attempts: {}", attempt, e),
                        });
                    }
                    let delay =
                        self.config.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Synthesizes with the configured defaults.
    pub async fn synthesize_default(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesize(
            text,
            &self.config.language_code.clone(),
            self.config.voice_gender,
        )
        .await
    }

    /// Synthesizes text and writes the audio to a file.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        language_code: &str,
        voice_gender: VoiceGender,
        path: &Path,
    ) -> Result<()> {
        let audio = self.synthesize(text, language_code, voice_gender).await?;
        tokio::fs::write(path, audio).await?;
        Ok(())
    }

    /// Synthesizes text and plays it through the given device.
    pub async fn speak(
        &self,
        text: &str,
        language_code: &str,
        voice_gender: VoiceGender,
        device: &dyn PlaybackDevice,
    ) -> Result<PlaybackHandle> {
        let audio = self.synthesize(text, language_code, voice_gender).await?;
        device.play(&audio)
    }

    /// Synthesizes two texts and starts playback on both devices.
    ///
    /// The playbacks are independent failure domains: each result stands on
    /// its own, and stopping one never affects the other.
    #[allow(clippy::too_many_arguments)]
    pub async fn speak_dual(
        &self,
        text_a: &str,
        language_a: &str,
        device_a: &dyn PlaybackDevice,
        text_b: &str,
        language_b: &str,
        device_b: &dyn PlaybackDevice,
    ) -> (Result<PlaybackHandle>, Result<PlaybackHandle>) {
        let gender = self.config.voice_gender;
        let (audio_a, audio_b) = tokio::join!(
            self.synthesize(text_a, language_a, gender),
            self.synthesize(text_b, language_b, gender),
        );

        match (audio_a, audio_b) {
            (Ok(a), Ok(b)) => play_dual(device_a, &a, device_b, &b),
            (Ok(a), Err(eb)) => (device_a.play(&a), Err(eb)),
            (Err(ea), Ok(b)) => (Err(ea), device_b.play(&b)),
            (Err(ea), Err(eb)) => (Err(ea), Err(eb)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::MockPlaybackDevice;
    use crate::synthesis::provider::MockSynthesisProvider;

    fn client_with(provider: MockSynthesisProvider) -> SynthesisClient {
        SynthesisClient::new(
            Arc::new(provider),
            SynthesisConfig {
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn synthesize_returns_audio_bytes() {
        let client = client_with(MockSynthesisProvider::new());
        let audio = client
            .synthesize("hello", "en-US", VoiceGender::Neutral)
            .await
            .unwrap();
        assert!(!audio.is_empty());
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let client = client_with(MockSynthesisProvider::new().with_failures(1));
        assert!(
            client
                .synthesize("hello", "en-US", VoiceGender::Neutral)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn exhausted_retries_surface_synthesis_unavailable() {
        let client = client_with(MockSynthesisProvider::new().with_failures(100));
        let result = client
            .synthesize("hello", "en-US", VoiceGender::Neutral)
            .await;

        assert!(matches!(
            result,
            Err(BabelcastError::SynthesisUnavailable { .. })
        ));
        assert_eq!(client.stats().snapshot().fail, 1);
    }

    #[tokio::test]
    async fn speak_plays_through_device() {
        let client = client_with(MockSynthesisProvider::new());
        let device = MockPlaybackDevice::new("speaker-a");

        let handle = client
            .speak("hello there", "en-US", VoiceGender::Female, &device)
            .await
            .unwrap();

        assert!(handle.is_active());
        handle.stop();
    }

    #[tokio::test]
    async fn speak_dual_starts_both_playbacks() {
        let client = client_with(MockSynthesisProvider::new());
        let device_a = MockPlaybackDevice::new("speaker-a").with_ms_per_byte(10);
        let device_b = MockPlaybackDevice::new("speaker-b").with_ms_per_byte(10);

        let (ha, hb) = client
            .speak_dual("hello", "en-US", &device_a, "hola", "es-ES", &device_b)
            .await;
        let ha = ha.unwrap();
        let hb = hb.unwrap();

        // Stop A; B keeps playing.
        ha.stop();
        assert!(ha.wait(Duration::from_secs(2)));
        assert!(hb.is_active());
        hb.stop();
    }

    #[tokio::test]
    async fn speak_dual_isolates_device_failure() {
        let client = client_with(MockSynthesisProvider::new());
        let device_a = MockPlaybackDevice::new("speaker-a").with_failure();
        let device_b = MockPlaybackDevice::new("speaker-b").with_ms_per_byte(10);

        let (ha, hb) = client
            .speak_dual("hello", "en-US", &device_a, "hola", "es-ES", &device_b)
            .await;

        assert!(ha.is_err());
        let hb = hb.unwrap();
        assert!(hb.is_active());
        hb.stop();
    }

    #[tokio::test]
    async fn synthesize_to_file_writes_audio() {
        let client = client_with(MockSynthesisProvider::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");

        client
            .synthesize_to_file("file me", "en-US", VoiceGender::Male, &path)
            .await
            .unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(!written.is_empty());
    }
}
