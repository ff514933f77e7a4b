use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognition: RecognitionSettings,
    pub translation: TranslationSettings,
    pub synthesis: SynthesisSettings,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub frame_samples: usize,
    pub queue_capacity: usize,
}

/// Streaming recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Address of the streaming recognition server ("host:port").
    pub endpoint: String,
    pub language: String,
    pub interim_results: bool,
    pub max_stream_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

/// Translation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationSettings {
    /// Base URL of the translation service.
    pub endpoint: String,
    pub source_language: String,
    pub target_language: String,
    pub model: Option<String>,
    pub cache_capacity: usize,
    pub batch_size: usize,
    pub max_retries: u32,
}

/// Synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Base URL of the synthesis service.
    pub endpoint: String,
    pub voice_gender: crate::synthesis::VoiceGender,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples: defaults::FRAME_SAMPLES,
            queue_capacity: defaults::FRAME_QUEUE_CAPACITY,
        }
    }
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:43007".to_string(),
            language: defaults::RECOGNITION_LANGUAGE.to_string(),
            interim_results: true,
            max_stream_secs: defaults::MAX_STREAM_DURATION.as_secs(),
            max_retries: defaults::MAX_RECONNECT_ATTEMPTS,
            retry_backoff_ms: defaults::RECONNECT_BACKOFF.as_millis() as u64,
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8089".to_string(),
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            model: None,
            cache_capacity: defaults::TRANSLATION_CACHE_CAPACITY,
            batch_size: defaults::TRANSLATION_BATCH_SIZE,
            max_retries: defaults::REQUEST_MAX_RETRIES,
        }
    }
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090".to_string(),
            voice_gender: crate::synthesis::VoiceGender::Neutral,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults only when
    /// the file does not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - BABELCAST_AUDIO_DEVICE → audio.device
    /// - BABELCAST_RECOGNITION_ENDPOINT → recognition.endpoint
    /// - BABELCAST_SOURCE_LANGUAGE → translation.source_language
    /// - BABELCAST_TARGET_LANGUAGE → translation.target_language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("BABELCAST_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(endpoint) = std::env::var("BABELCAST_RECOGNITION_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.recognition.endpoint = endpoint;
        }

        if let Ok(language) = std::env::var("BABELCAST_SOURCE_LANGUAGE")
            && !language.is_empty()
        {
            self.translation.source_language = language;
        }

        if let Ok(language) = std::env::var("BABELCAST_TARGET_LANGUAGE")
            && !language.is_empty()
        {
            self.translation.target_language = language;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/babelcast/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("babelcast").join("config.toml"))
    }
}
