//! Translation client: caching, bounded retries, and chunked streaming.

use crate::defaults;
use crate::error::{BabelcastError, Result};
use crate::stats::ServiceStats;
use crate::translate::cache::{CacheKey, TranslationCache};
use crate::translate::provider::{LanguageDetection, TranslationProvider, TranslationRequest};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// One completed translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub source_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub detected_language: Option<String>,
    pub latency_ms: u64,
}

/// Configuration for the translation client.
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub source_language: String,
    pub target_language: String,
    /// Provider-specific model selector.
    pub model: Option<String>,
    pub cache_capacity: usize,
    pub max_retries: u32,
    /// Base retry delay; doubles on each attempt.
    pub retry_backoff: Duration,
    /// Chunks batched per streaming translation call.
    pub batch_size: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            model: None,
            cache_capacity: defaults::TRANSLATION_CACHE_CAPACITY,
            max_retries: defaults::REQUEST_MAX_RETRIES,
            retry_backoff: defaults::REQUEST_RETRY_BACKOFF,
            batch_size: defaults::TRANSLATION_BATCH_SIZE,
        }
    }
}

/// Client over an opaque translation provider.
///
/// Results are cached by exact (text, source, target) key; a failed request
/// is surfaced as `TranslationUnavailable` and never silently replaced with
/// the untranslated input.
pub struct TranslationClient {
    provider: Arc<dyn TranslationProvider>,
    config: TranslationConfig,
    cache: Mutex<TranslationCache>,
    stats: Arc<ServiceStats>,
}

impl TranslationClient {
    pub fn new(provider: Arc<dyn TranslationProvider>, config: TranslationConfig) -> Self {
        let cache = Mutex::new(TranslationCache::new(config.cache_capacity));
        Self {
            provider,
            config,
            cache,
            stats: Arc::new(ServiceStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<ServiceStats> {
        Arc::clone(&self.stats)
    }

    /// Translates with the configured language pair.
    pub async fn translate(&self, text: &str) -> Result<TranslationResult> {
        self.translate_pair(
            text,
            &self.config.source_language.clone(),
            &self.config.target_language.clone(),
        )
        .await
    }

    /// Translates between an explicit language pair.
    pub async fn translate_pair(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslationResult> {
        let key: CacheKey = (
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        );

        if let Ok(mut cache) = self.cache.lock()
            && let Some(hit) = cache.get(&key)
        {
            return Ok(hit);
        }

        let request = TranslationRequest {
            text: text.to_string(),
            source_language: Some(source_language.to_string()),
            target_language: target_language.to_string(),
            model: self.config.model.clone(),
        };

        let started = Instant::now();
        let mut attempt: u32 = 0;
        let translation = loop {
            match self.provider.translate(&request).await {
                Ok(translation) => break translation,
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        self.stats.record_failure();
                        return Err(BabelcastError::TranslationUnavailable {
                            message: format!("failed after {} attempts: {}", attempt, e),
                        });
                    }
                    let delay =
                        self.config.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1));
                    tokio::time::sleep(delay).await;
                }
            }
        };

        let latency = started.elapsed();
        self.stats.record_success(latency);

        let result = TranslationResult {
            source_text: text.to_string(),
            translated_text: translation.translated_text,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            detected_language: translation.detected_source_language,
            latency_ms: latency.as_millis() as u64,
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, result.clone());
        }

        Ok(result)
    }

    /// Translates a stream of text chunks, batching `batch_size` chunks per
    /// provider call to bound request volume. The trailing partial batch is
    /// flushed when the input ends.
    ///
    /// A failed batch is reported on stderr and skipped; the stream keeps
    /// going — one bad request must not end the session.
    pub async fn translate_stream(
        &self,
        mut chunks: mpsc::UnboundedReceiver<String>,
        results: mpsc::UnboundedSender<TranslationResult>,
    ) {
        let batch_size = self.config.batch_size.max(1);
        let mut buffer: Vec<String> = Vec::new();

        loop {
            let flushed_tail = match chunks.recv().await {
                Some(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    buffer.push(trimmed.to_string());
                    if buffer.len() < batch_size {
                        continue;
                    }
                    false
                }
                None => {
                    if buffer.is_empty() {
                        return;
                    }
                    true
                }
            };
            let combined = buffer.join(" ");
            buffer.clear();
            match self.translate(&combined).await {
                Ok(result) => {
                    if results.send(result).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    eprintln!("babelcast: translation failed: {}", e);
                }
            }

            if flushed_tail {
                return;
            }
        }
    }

    /// Detects the language of a text. Results are intentionally not cached.
    pub async fn detect_language(&self, text: &str) -> Result<LanguageDetection> {
        self.provider.detect_language(text).await
    }

    /// Number of cached translations.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::provider::MockTranslationProvider;

    fn client_with(provider: MockTranslationProvider) -> TranslationClient {
        TranslationClient::new(
            Arc::new(provider),
            TranslationConfig {
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn translate_returns_provider_result() {
        let client = client_with(MockTranslationProvider::new().with_response("hello", "hola"));

        let result = client.translate("hello").await.unwrap();
        assert_eq!(result.translated_text, "hola");
        assert_eq!(result.source_language, "en");
        assert_eq!(result.target_language, "es");
    }

    #[tokio::test]
    async fn identical_calls_issue_one_provider_request() {
        let provider = Arc::new(MockTranslationProvider::new().with_response("hello", "hola"));
        let client = TranslationClient::new(provider.clone(), TranslationConfig::default());

        let first = client.translate("hello").await.unwrap();
        let second = client.translate("hello").await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn different_target_language_misses_the_cache() {
        let provider = Arc::new(MockTranslationProvider::new());
        let client = TranslationClient::new(provider.clone(), TranslationConfig::default());

        client.translate_pair("hello", "en", "es").await.unwrap();
        client.translate_pair("hello", "en", "fr").await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(client.cache_len(), 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let provider = Arc::new(MockTranslationProvider::new().with_failures(1));
        let client = TranslationClient::new(
            provider.clone(),
            TranslationConfig {
                max_retries: 2,
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            },
        );

        let result = client.translate("retry me").await.unwrap();
        assert_eq!(result.translated_text, "retry me [es]");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_unavailable_not_source_text() {
        let provider = Arc::new(MockTranslationProvider::new().with_failures(100));
        let client = TranslationClient::new(
            provider,
            TranslationConfig {
                max_retries: 1,
                retry_backoff: Duration::from_millis(1),
                ..Default::default()
            },
        );

        let result = client.translate("doomed").await;
        assert!(matches!(
            result,
            Err(BabelcastError::TranslationUnavailable { .. })
        ));
        // Failure must never be cached or passed off as a translation.
        assert_eq!(client.cache_len(), 0);
        assert_eq!(client.stats().snapshot().fail, 1);
    }

    #[tokio::test]
    async fn stream_batches_chunks_and_flushes_tail() {
        let provider = Arc::new(MockTranslationProvider::new());
        let client = TranslationClient::new(
            provider.clone(),
            TranslationConfig {
                batch_size: 2,
                ..Default::default()
            },
        );

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        for chunk in ["one", "two", "three"] {
            chunk_tx.send(chunk.to_string()).unwrap();
        }
        drop(chunk_tx);

        client.translate_stream(chunk_rx, result_tx).await;

        let first = result_rx.recv().await.unwrap();
        assert_eq!(first.source_text, "one two");
        let second = result_rx.recv().await.unwrap();
        assert_eq!(second.source_text, "three");
        assert!(result_rx.recv().await.is_none());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn stream_skips_empty_chunks() {
        let provider = Arc::new(MockTranslationProvider::new());
        let client = TranslationClient::new(
            provider.clone(),
            TranslationConfig {
                batch_size: 1,
                ..Default::default()
            },
        );

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        chunk_tx.send("  ".to_string()).unwrap();
        chunk_tx.send("real text".to_string()).unwrap();
        drop(chunk_tx);

        client.translate_stream(chunk_rx, result_tx).await;

        assert_eq!(result_rx.recv().await.unwrap().source_text, "real text");
        assert!(result_rx.recv().await.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn detect_language_is_not_cached() {
        let provider = Arc::new(MockTranslationProvider::new().with_detection("ja", 0.91));
        let client = TranslationClient::new(provider, TranslationConfig::default());

        let detection = client.detect_language("こんにちは").await.unwrap();
        assert_eq!(detection.language, "ja");
        assert_eq!(client.cache_len(), 0);
    }

    #[tokio::test]
    async fn stats_track_latency_and_counts() {
        let client = client_with(MockTranslationProvider::new());

        client.translate("a").await.unwrap();
        client.translate("b").await.unwrap();

        let snap = client.stats().snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.success, 2);
    }
}
