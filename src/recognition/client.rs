//! Streaming recognition client: forwards frames to a provider stream and
//! delivers recognition events in order, surviving stream rotation and
//! transient transport failures.

use crate::audio::source::AudioFrame;
use crate::error::{BabelcastError, Result};
use crate::recognition::provider::{ProviderStream, RecognitionProvider};
use crate::recognition::types::{RecognitionConfig, RecognitionEvent, RecognizerState, StreamEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared view of a recognizer's lifecycle state.
#[derive(Clone)]
pub struct RecognizerStateHandle {
    state: Arc<Mutex<RecognizerState>>,
}

impl RecognizerStateHandle {
    pub fn get(&self) -> RecognizerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(RecognizerState::Error)
    }
}

/// How one provider stream ended.
enum StreamOutcome {
    /// Input channel closed and trailing events were drained.
    Finished,
    /// Stream expired or hit the rotation deadline; reopen transparently.
    Rotate,
    /// Transport failed; reconnect with backoff.
    Transport(String),
    /// The downstream event consumer went away.
    ConsumerGone,
}

/// Client side of the streaming recognition boundary.
///
/// State machine: `Idle → Streaming → (Error | Stopped)`. Stream rotation
/// (provider expiry or the proactive deadline) stays inside `Streaming`;
/// consumers never observe it.
pub struct StreamingRecognizer {
    provider: Arc<dyn RecognitionProvider>,
    config: RecognitionConfig,
    state: Arc<Mutex<RecognizerState>>,
    sequence: u64,
}

impl StreamingRecognizer {
    pub fn new(provider: Arc<dyn RecognitionProvider>, config: RecognitionConfig) -> Self {
        Self {
            provider,
            config,
            state: Arc::new(Mutex::new(RecognizerState::Idle)),
            sequence: 0,
        }
    }

    pub fn state(&self) -> RecognizerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(RecognizerState::Error)
    }

    /// Returns a handle that tracks this recognizer's state after `run`
    /// takes ownership.
    pub fn state_handle(&self) -> RecognizerStateHandle {
        RecognizerStateHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn set_state(&self, state: RecognizerState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.config.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Runs the recognition session until the frame channel closes or the
    /// reconnect budget is exhausted.
    ///
    /// Frames arriving while a stream is being rotated stay buffered in the
    /// input channel; nothing is dropped across a restart.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        events_out: mpsc::Sender<RecognitionEvent>,
    ) -> Result<()> {
        self.set_state(RecognizerState::Streaming);
        let mut pending: Option<AudioFrame> = None;
        let mut attempt: u32 = 0;
        let mut rotating = false;

        loop {
            let stream = match self.provider.open_stream(&self.config).await {
                Ok(stream) => stream,
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        self.set_state(RecognizerState::Error);
                        let message = format!(
                            "reconnect failed after {} attempts: {}",
                            attempt - 1,
                            e
                        );
                        // A reopen that was forced by stream expiry fails as
                        // StreamExpired; everything else is plain unavailability.
                        return Err(if rotating {
                            BabelcastError::StreamExpired { message }
                        } else {
                            BabelcastError::RecognitionUnavailable { message }
                        });
                    }
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                    continue;
                }
            };
            attempt = 0;
            rotating = false;

            let (outcome, mut events) = self
                .pump_stream(stream, &mut frames, &events_out, &mut pending)
                .await;

            // Deliver any events the provider emitted before the stream ended.
            while let Ok(event) = events.try_recv() {
                if let StreamEvent::Recognition(mut ev) = event {
                    ev.sequence = self.next_sequence();
                    if events_out.send(ev).await.is_err() {
                        self.set_state(RecognizerState::Stopped);
                        return Ok(());
                    }
                }
            }

            match outcome {
                StreamOutcome::Finished | StreamOutcome::ConsumerGone => {
                    self.set_state(RecognizerState::Stopped);
                    return Ok(());
                }
                StreamOutcome::Rotate => {
                    rotating = true;
                    continue;
                }
                StreamOutcome::Transport(message) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        self.set_state(RecognizerState::Error);
                        return Err(BabelcastError::RecognitionUnavailable { message });
                    }
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
            }
        }
    }

    /// Drives one provider stream to its end. Returns how it ended plus the
    /// event receiver so trailing events can be flushed.
    async fn pump_stream(
        &mut self,
        stream: ProviderStream,
        frames: &mut mpsc::Receiver<AudioFrame>,
        events_out: &mpsc::Sender<RecognitionEvent>,
        pending: &mut Option<AudioFrame>,
    ) -> (StreamOutcome, mpsc::Receiver<StreamEvent>) {
        let ProviderStream {
            audio_tx,
            mut events,
        } = stream;

        // Re-send the frame carried over from a rotated stream.
        if let Some(frame) = pending.take() {
            if let Err(err) = audio_tx.send(frame).await {
                *pending = Some(err.0);
                return (
                    StreamOutcome::Transport("stream rejected audio".to_string()),
                    events,
                );
            }
        }

        let mut audio_tx = Some(audio_tx);
        let rotate_at = tokio::time::Instant::now() + self.config.max_stream_duration;
        let mut drain_at: Option<tokio::time::Instant> = None;

        let outcome = loop {
            tokio::select! {
                maybe_frame = frames.recv(), if audio_tx.is_some() => {
                    match maybe_frame {
                        Some(frame) => {
                            // Guard above ensures the sender is present.
                            let send_err = match &audio_tx {
                                Some(tx) => tx.send(frame).await.err(),
                                None => None,
                            };
                            if let Some(err) = send_err {
                                *pending = Some(err.0);
                                break StreamOutcome::Transport(
                                    "stream closed while sending audio".to_string(),
                                );
                            }
                        }
                        None => {
                            // End of input: drop the sender so the provider
                            // flushes, then wait for trailing events.
                            audio_tx = None;
                            drain_at = Some(
                                tokio::time::Instant::now() + crate::defaults::DRAIN_TIMEOUT,
                            );
                        }
                    }
                }
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(StreamEvent::Recognition(mut ev)) => {
                            ev.sequence = self.next_sequence();
                            if events_out.send(ev).await.is_err() {
                                break StreamOutcome::ConsumerGone;
                            }
                        }
                        Some(StreamEvent::Expired) => break StreamOutcome::Rotate,
                        Some(StreamEvent::Error(message)) => {
                            break StreamOutcome::Transport(message);
                        }
                        Some(StreamEvent::Closed) | None => {
                            if audio_tx.is_none() {
                                break StreamOutcome::Finished;
                            }
                            break StreamOutcome::Transport(
                                "stream closed unexpectedly".to_string(),
                            );
                        }
                    }
                }
                _ = tokio::time::sleep_until(rotate_at), if audio_tx.is_some() => {
                    break StreamOutcome::Rotate;
                }
                _ = tokio::time::sleep_until(
                    drain_at.unwrap_or_else(tokio::time::Instant::now)
                ), if drain_at.is_some() => {
                    // Provider never confirmed close; treat input as finished.
                    break StreamOutcome::Finished;
                }
            }
        };

        (outcome, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::provider::{MockRecognitionProvider, SessionScript};

    fn frame(seq: u64) -> AudioFrame {
        AudioFrame::new(vec![seq as i16; 8], seq)
    }

    async fn run_session(
        provider: MockRecognitionProvider,
        config: RecognitionConfig,
        frame_count: u64,
    ) -> (Vec<RecognitionEvent>, Result<()>, RecognizerStateHandle) {
        let recognizer = StreamingRecognizer::new(Arc::new(provider), config);
        let state = recognizer.state_handle();

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);

        let run = tokio::spawn(recognizer.run(frame_rx, event_tx));

        let feeder = tokio::spawn(async move {
            for i in 0..frame_count {
                if frame_tx.send(frame(i)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            // Dropping frame_tx signals end of input.
        });

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            events.push(event);
        }

        feeder.await.expect("feeder panicked");
        let result = run.await.expect("recognizer panicked");
        (events, result, state)
    }

    #[tokio::test]
    async fn delivers_events_in_order_and_stops_cleanly() {
        let provider = MockRecognitionProvider::new().with_session(
            SessionScript::new()
                .await_frames(1)
                .interim("Hel")
                .interim("Hello")
                .await_frames(1)
                .finalized("Hello world", 0.95),
        );

        let (events, result, state) =
            run_session(provider, RecognitionConfig::default(), 4).await;

        result.unwrap();
        assert_eq!(state.get(), RecognizerState::Stopped);

        let texts: Vec<&str> = events.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Hel", "Hello", "Hello world"]);

        // Sequence numbers are monotonic across the session.
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn expiry_rotates_the_stream_without_observable_stop() {
        let provider = MockRecognitionProvider::new()
            .with_session(
                SessionScript::new()
                    .await_frames(2)
                    .finalized("first utterance", 0.9)
                    .expire(),
            )
            .with_session(
                SessionScript::new()
                    .await_frames(2)
                    .finalized("second utterance", 0.85),
            );

        let (events, result, state) =
            run_session(provider, RecognitionConfig::default(), 8).await;

        result.unwrap();
        assert_eq!(state.get(), RecognizerState::Stopped);

        let finals: Vec<&str> = events
            .iter()
            .filter(|e| e.is_final)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(finals, vec!["first utterance", "second utterance"]);

        // Sequence numbering continues across the rotation.
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn transient_open_failures_recover_with_backoff() {
        let config = RecognitionConfig {
            max_retries: 3,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let provider = MockRecognitionProvider::new()
            .with_open_failures(2)
            .with_session(SessionScript::new().await_frames(1).finalized("ok", 0.8));

        let (events, result, state) = run_session(provider, config, 3).await;

        result.unwrap();
        assert_eq!(state.get(), RecognizerState::Stopped);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "ok");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_recognition_unavailable() {
        let config = RecognitionConfig {
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let provider = MockRecognitionProvider::new().with_open_failures(10);

        let (events, result, state) = run_session(provider, config, 2).await;

        assert!(events.is_empty());
        assert!(matches!(
            result,
            Err(BabelcastError::RecognitionUnavailable { .. })
        ));
        assert_eq!(state.get(), RecognizerState::Error);
    }

    #[tokio::test]
    async fn failed_reopen_after_expiry_surfaces_stream_expired() {
        let config = RecognitionConfig {
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        // The first session expires; every reopen attempt then fails, so the
        // rotation cannot stay invisible and must surface as StreamExpired.
        let provider = MockRecognitionProvider::new()
            .with_session(
                SessionScript::new()
                    .await_frames(1)
                    .finalized("before expiry", 0.9)
                    .expire(),
            )
            .with_failed_open()
            .with_failed_open();

        let (events, result, state) = run_session(provider, config, 4).await;

        let finals: Vec<&str> = events
            .iter()
            .filter(|e| e.is_final)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(finals, vec!["before expiry"]);
        assert!(matches!(result, Err(BabelcastError::StreamExpired { .. })));
        assert_eq!(state.get(), RecognizerState::Error);
    }

    #[tokio::test]
    async fn transport_error_mid_stream_reconnects() {
        let config = RecognitionConfig {
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let provider = MockRecognitionProvider::new()
            .with_session(
                SessionScript::new()
                    .await_frames(1)
                    .finalized("before failure", 0.9)
                    .error("connection reset"),
            )
            .with_session(
                SessionScript::new()
                    .await_frames(1)
                    .finalized("after reconnect", 0.9),
            );

        let (events, result, state) = run_session(provider, config, 6).await;

        result.unwrap();
        assert_eq!(state.get(), RecognizerState::Stopped);

        let finals: Vec<&str> = events
            .iter()
            .filter(|e| e.is_final)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(finals, vec!["before failure", "after reconnect"]);
    }

    #[tokio::test]
    async fn proactive_rotation_deadline_reopens_stream() {
        let config = RecognitionConfig {
            max_stream_duration: Duration::from_millis(30),
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let provider = MockRecognitionProvider::new()
            .with_session(SessionScript::new().await_frames(1).interim("early"))
            .with_session(
                SessionScript::new().await_frames(1).finalized("late", 0.9),
            );

        let recognizer = StreamingRecognizer::new(Arc::new(provider), config);
        let state = recognizer.state_handle();

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let run = tokio::spawn(recognizer.run(frame_rx, event_tx));

        // Slow feeder keeps the session alive past the rotation deadline.
        let feeder = tokio::spawn(async move {
            for i in 0..6u64 {
                if frame_tx.send(frame(i)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(15)).await;
            }
        });

        let mut events = Vec::new();
        while let Some(event) = event_rx.recv().await {
            events.push(event);
        }

        feeder.await.expect("feeder panicked");
        run.await.expect("recognizer panicked").unwrap();
        assert_eq!(state.get(), RecognizerState::Stopped);

        let texts: Vec<&str> = events.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"early"), "events: {:?}", texts);
        assert!(texts.contains(&"late"), "events: {:?}", texts);
    }

    #[tokio::test]
    async fn recognizer_starts_idle() {
        let provider = Arc::new(MockRecognitionProvider::new());
        let recognizer = StreamingRecognizer::new(provider, RecognitionConfig::default());
        assert_eq!(recognizer.state(), RecognizerState::Idle);
    }
}
