//! Translation provider boundary.

use crate::error::{BabelcastError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Request for one translation.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest {
    pub text: String,
    /// Source language; omitted to let the provider detect it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub target_language: String,
    /// Provider-specific model selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Raw provider response for a translation.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTranslation {
    pub translated_text: String,
    pub detected_source_language: Option<String>,
}

/// Result of language detection. Never cached — detection is treated as
/// context-sensitive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f32,
}

/// Opaque request/response translation service.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<ProviderTranslation>;

    async fn detect_language(&self, text: &str) -> Result<LanguageDetection>;
}

/// Translation provider speaking JSON over HTTP.
pub struct HttpTranslationProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslationProvider {
    /// Creates a provider for the given base endpoint, e.g.
    /// `http://localhost:8089`.
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslationProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<ProviderTranslation> {
        let url = format!("{}/translate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BabelcastError::TranslationUnavailable {
                message: format!("request to {} failed: {}", url, e),
            })?;

        if !response.status().is_success() {
            return Err(BabelcastError::TranslationUnavailable {
                message: format!("{} returned status {}", url, response.status()),
            });
        }

        response
            .json::<ProviderTranslation>()
            .await
            .map_err(|e| BabelcastError::TranslationUnavailable {
                message: format!("malformed translation response: {}", e),
            })
    }

    async fn detect_language(&self, text: &str) -> Result<LanguageDetection> {
        #[derive(Serialize)]
        struct DetectRequest<'a> {
            text: &'a str,
        }

        let url = format!("{}/detect", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&DetectRequest { text })
            .send()
            .await
            .map_err(|e| BabelcastError::TranslationUnavailable {
                message: format!("request to {} failed: {}", url, e),
            })?;

        if !response.status().is_success() {
            return Err(BabelcastError::TranslationUnavailable {
                message: format!("{} returned status {}", url, response.status()),
            });
        }

        response
            .json::<LanguageDetection>()
            .await
            .map_err(|e| BabelcastError::TranslationUnavailable {
                message: format!("malformed detection response: {}", e),
            })
    }
}

/// Mock translation provider for testing.
///
/// Translates by suffixing the target language; counts provider calls so
/// tests can assert cache behavior.
pub struct MockTranslationProvider {
    responses: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    fail_calls: AtomicUsize,
    detection: Mutex<LanguageDetection>,
}

impl MockTranslationProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            fail_calls: AtomicUsize::new(0),
            detection: Mutex::new(LanguageDetection {
                language: "en".to_string(),
                confidence: 0.99,
            }),
        }
    }

    /// Fixed translation for a specific input text.
    pub fn with_response(self, text: &str, translated: &str) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(text.to_string(), translated.to_string());
        }
        self
    }

    /// Fail the first `n` translate calls.
    pub fn with_failures(self, n: usize) -> Self {
        self.fail_calls.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_detection(self, language: &str, confidence: f32) -> Self {
        if let Ok(mut detection) = self.detection.lock() {
            *detection = LanguageDetection {
                language: language.to_string(),
                confidence,
            };
        }
        self
    }

    /// Number of translate calls that reached the provider.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for MockTranslationProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<ProviderTranslation> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .fail_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BabelcastError::TranslationUnavailable {
                message: "mock translation failure".to_string(),
            });
        }

        let translated = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(&request.text).cloned())
            .unwrap_or_else(|| format!("{} [{}]", request.text, request.target_language));

        Ok(ProviderTranslation {
            translated_text: translated,
            detected_source_language: request.source_language.clone(),
        })
    }

    async fn detect_language(&self, _text: &str) -> Result<LanguageDetection> {
        self.detection
            .lock()
            .map(|d| d.clone())
            .map_err(|_| BabelcastError::TranslationUnavailable {
                message: "detection lock poisoned".to_string(),
            })
    }
}
