//! Downstream pipeline tests: final results flowing into translation,
//! synthesis, and dual-speaker playback.

use babelcast::audio::playback::MockPlaybackDevice;
use babelcast::dispatch::{ChannelSink, ResultDispatcher};
use babelcast::recognition::types::RecognitionEvent;
use babelcast::speakers::{SpeakerAssignment, SpeakerRouter, SpeakerSlot};
use babelcast::synthesis::client::{SynthesisClient, SynthesisConfig};
use babelcast::synthesis::provider::{MockSynthesisProvider, VoiceGender};
use babelcast::translate::client::{TranslationClient, TranslationConfig};
use babelcast::translate::provider::MockTranslationProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn translation_client(provider: Arc<MockTranslationProvider>) -> TranslationClient {
    TranslationClient::new(
        provider,
        TranslationConfig {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn only_final_text_reaches_translation() {
    let provider = Arc::new(MockTranslationProvider::new().with_response("Hello world", "Hola mundo"));
    let client = translation_client(provider.clone());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut dispatcher = ResultDispatcher::new().with_sink(Box::new(ChannelSink::new(event_tx)));

    dispatcher.dispatch(&RecognitionEvent::interim("Hel"));
    dispatcher.dispatch(&RecognitionEvent::interim("Hello"));
    dispatcher.dispatch(&RecognitionEvent::finalized("Hello world", 0.95));
    drop(dispatcher);

    let mut translated = Vec::new();
    while let Some(event) = event_rx.recv().await {
        let result = client.translate(&event.text).await.expect("translate");
        translated.push(result.translated_text);
    }

    // Interims never generated a request; only the final was translated.
    assert_eq!(translated, vec!["Hola mundo"]);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn repeated_finals_hit_the_cache() {
    let provider = Arc::new(MockTranslationProvider::new());
    let client = translation_client(provider.clone());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut dispatcher = ResultDispatcher::new().with_sink(Box::new(ChannelSink::new(event_tx)));

    // The same phrase finalized twice, as happens with repeated speech.
    dispatcher.dispatch(&RecognitionEvent::finalized("good morning", 0.9));
    dispatcher.dispatch(&RecognitionEvent::finalized("good morning", 0.92));
    drop(dispatcher);

    let mut results = Vec::new();
    while let Some(event) = event_rx.recv().await {
        results.push(client.translate(&event.text).await.expect("translate"));
    }

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], results[1]);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn chunked_translation_follows_the_event_stream() {
    let provider = Arc::new(MockTranslationProvider::new());
    let client = Arc::new(TranslationClient::new(
        provider.clone(),
        TranslationConfig {
            batch_size: 2,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        },
    ));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RecognitionEvent>();
    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel::<String>();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel();

    // Adapter: final recognition events become text chunks.
    let adapter = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if chunk_tx.send(event.text).is_err() {
                break;
            }
        }
    });

    let stream_client = Arc::clone(&client);
    let translator =
        tokio::spawn(async move { stream_client.translate_stream(chunk_rx, result_tx).await });

    let mut dispatcher = ResultDispatcher::new().with_sink(Box::new(ChannelSink::new(event_tx)));
    for text in ["one", "two", "three"] {
        dispatcher.dispatch(&RecognitionEvent::finalized(text, 0.9));
    }
    drop(dispatcher);

    adapter.await.expect("adapter panicked");
    translator.await.expect("translator panicked");

    let first = result_rx.recv().await.expect("first batch");
    assert_eq!(first.source_text, "one two");
    let second = result_rx.recv().await.expect("trailing batch");
    assert_eq!(second.source_text, "three");
    assert!(result_rx.recv().await.is_none());
}

#[tokio::test]
async fn dual_speaker_broadcast_speaks_both_languages() {
    let router = SpeakerRouter::new();
    router.assign(
        SpeakerSlot::A,
        SpeakerAssignment {
            language: "es".to_string(),
            device_id: Some("hw:0".to_string()),
            device_name: "left hall".to_string(),
        },
    );
    router.assign(
        SpeakerSlot::B,
        SpeakerAssignment {
            language: "fr".to_string(),
            device_id: Some("hw:1".to_string()),
            device_name: "right hall".to_string(),
        },
    );

    let translation = translation_client(Arc::new(MockTranslationProvider::new()));
    let synthesis = SynthesisClient::new(
        Arc::new(MockSynthesisProvider::new()),
        SynthesisConfig {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        },
    );

    // Translate the final text once per assigned speaker language.
    let spanish = translation
        .translate_pair("welcome everyone", "en", "es")
        .await
        .expect("spanish translation");
    let french = translation
        .translate_pair("welcome everyone", "en", "fr")
        .await
        .expect("french translation");

    let (slot_a, _) = router.slot_for_language("es").expect("es routed");
    let (slot_b, _) = router.slot_for_language("fr").expect("fr routed");
    assert_ne!(slot_a, slot_b);

    let device_a = MockPlaybackDevice::new("left hall").with_ms_per_byte(10);
    let device_b = MockPlaybackDevice::new("right hall").with_ms_per_byte(10);

    let (handle_a, handle_b) = synthesis
        .speak_dual(
            &spanish.translated_text,
            "es",
            &device_a,
            &french.translated_text,
            "fr",
            &device_b,
        )
        .await;
    let handle_a = handle_a.expect("speaker A starts");
    let handle_b = handle_b.expect("speaker B starts");

    // Stopping A must not halt B.
    handle_a.stop();
    assert!(handle_a.wait(Duration::from_secs(2)));
    assert!(handle_b.is_active());
    handle_b.stop();
}

#[tokio::test]
async fn failed_translation_never_reaches_the_speakers() {
    let provider = Arc::new(MockTranslationProvider::new().with_failures(100));
    let client = TranslationClient::new(
        provider,
        TranslationConfig {
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        },
    );

    let synthesis_provider: Arc<dyn SynthesisProvider> = Arc::new(MockSynthesisProvider::new());
    let synthesis = SynthesisClient::new(Arc::clone(&synthesis_provider), SynthesisConfig::default());

    // The failed translation is an error, not untranslated text; nothing is
    // synthesized for it.
    if client.translate("important announcement").await.is_ok() {
        let _unused = synthesis
            .synthesize_default("should never run")
            .await
            .expect("unreachable");
    }

    assert_eq!(synthesis_provider.call_count(), 0);
    assert_eq!(client.stats().snapshot().fail, 1);
}

#[tokio::test]
async fn voice_gender_is_forwarded_to_the_provider() {
    let provider = Arc::new(MockSynthesisProvider::new());
    let client = SynthesisClient::new(Arc::clone(&provider), SynthesisConfig::default());

    let audio = client
        .synthesize("bonjour", "fr-FR", VoiceGender::Female)
        .await
        .expect("synthesize");

    assert!(!audio.is_empty());
    assert_eq!(provider.call_count(), 1);
}
