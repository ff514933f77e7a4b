//! Text translation: provider boundary, bounded result cache, and client.

pub mod cache;
pub mod client;
pub mod provider;

pub use cache::TranslationCache;
pub use client::{TranslationClient, TranslationConfig, TranslationResult};
pub use provider::{
    HttpTranslationProvider, LanguageDetection, MockTranslationProvider, ProviderTranslation,
    TranslationProvider, TranslationRequest,
};
