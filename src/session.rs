//! Live session orchestration.
//!
//! One `LiveSession` owns the whole capture → recognition → dispatch chain:
//! a capture thread polling the audio device, the bounded frame queue, a pump
//! thread bridging the queue into the async side, the streaming recognizer
//! task, and the dispatcher task. No state is global, so multiple sessions
//! can run side by side.
//!
//! Shutdown propagates in pipeline order: the capture thread exits and closes
//! the frame queue, the pump drains it and signals end-of-input to the
//! recognizer, the recognizer drains trailing provider events, and the
//! dispatcher consumes whatever is left. No stage blocks on one that has
//! already stopped producing.

use crate::audio::source::{AudioFrame, AudioSource};
use crate::defaults;
use crate::dispatch::ResultDispatcher;
use crate::error::{BabelcastError, Result};
use crate::queue::{FrameQueue, FrameSender, PushOutcome};
use crate::recognition::client::{RecognizerStateHandle, StreamingRecognizer};
use crate::recognition::provider::RecognitionProvider;
use crate::recognition::types::{RecognitionConfig, RecognizerState};
use crate::report::{ErrorReporter, LogReporter, StageError};
use crate::stats::{ServiceStats, StatsRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for a live session.
#[derive(Debug, Clone)]
pub struct LiveSessionConfig {
    /// Capacity of the bounded frame queue (drop-oldest under backpressure).
    pub queue_capacity: usize,
    /// Samples per frame pushed onto the queue.
    pub frame_samples: usize,
    /// How often the capture thread polls the audio source.
    pub poll_interval: Duration,
    /// Capacity of the async channels between pump, recognizer and dispatcher.
    pub channel_capacity: usize,
    /// Streaming recognition configuration.
    pub recognition: RecognitionConfig,
}

impl Default for LiveSessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::FRAME_QUEUE_CAPACITY,
            frame_samples: defaults::FRAME_SAMPLES,
            poll_interval: Duration::from_millis(16),
            channel_capacity: defaults::CHANNEL_CAPACITY,
            recognition: RecognitionConfig::default(),
        }
    }
}

impl LiveSessionConfig {
    /// Builds a session configuration from the loaded application config.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            queue_capacity: config.audio.queue_capacity,
            frame_samples: config.audio.frame_samples,
            poll_interval: Duration::from_millis(16),
            channel_capacity: defaults::CHANNEL_CAPACITY,
            recognition: RecognitionConfig {
                language: config.recognition.language.clone(),
                sample_rate: config.audio.sample_rate,
                interim_results: config.recognition.interim_results,
                max_stream_duration: Duration::from_secs(config.recognition.max_stream_secs),
                max_retries: config.recognition.max_retries,
                retry_backoff: Duration::from_millis(config.recognition.retry_backoff_ms),
            },
        }
    }
}

/// How a completed session ended.
pub struct SessionOutcome {
    /// Terminal result of the recognizer: `Ok` after a clean stop,
    /// `RecognitionUnavailable` after exhausted reconnects.
    pub recognition: Result<()>,
    /// The dispatcher with its sinks, for inspecting collected results.
    pub dispatcher: ResultDispatcher,
}

/// A live capture → recognition → dispatch session.
pub struct LiveSession {
    config: LiveSessionConfig,
    reporter: Arc<dyn ErrorReporter>,
}

impl LiveSession {
    pub fn new(config: LiveSessionConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter for background stage failures.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Starts the session. Must be called within a tokio runtime.
    ///
    /// Fails immediately with `DeviceBusy` if the audio source is already
    /// active. For finite sources (WAV files) the session ends on its own
    /// once the source is exhausted; `SessionHandle::join` waits for that.
    pub fn start(
        self,
        mut source: Box<dyn AudioSource>,
        provider: Arc<dyn RecognitionProvider>,
        dispatcher: ResultDispatcher,
    ) -> Result<SessionHandle> {
        source.start()?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(StatsRegistry::new());
        let audio_stats = Arc::new(ServiceStats::new());
        stats.register("audio", Arc::clone(&audio_stats));
        stats.register("dispatch", dispatcher.stats());

        let (queue_tx, queue_rx) = FrameQueue::bounded(self.config.queue_capacity);
        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(self.config.channel_capacity);
        let (event_tx, mut event_rx) = mpsc::channel(self.config.channel_capacity);

        // Capture thread: blocking device I/O, frames onto the bounded queue.
        let capture = {
            let running = Arc::clone(&running);
            let reporter = Arc::clone(&self.reporter);
            let poll_interval = self.config.poll_interval;
            let frame_samples = self.config.frame_samples.max(1);
            thread::spawn(move || {
                capture_loop(
                    source.as_mut(),
                    &queue_tx,
                    &running,
                    &audio_stats,
                    reporter.as_ref(),
                    poll_interval,
                    frame_samples,
                );
                // Dropping the sender closes the queue and wakes the pump.
                drop(queue_tx);
                if let Err(e) = source.stop() {
                    reporter.report("capture", &StageError::Recoverable(e.to_string()));
                }
            })
        };

        // Pump thread: bridges the blocking queue into the async side.
        // Draining until `pop` returns None preserves queued frames across
        // shutdown; dropping `frame_tx` is the recognizer's end-of-input.
        let pump = thread::spawn(move || {
            while let Some(frame) = queue_rx.pop() {
                if frame_tx.blocking_send(frame).is_err() {
                    break;
                }
            }
        });

        let recognizer = StreamingRecognizer::new(provider, self.config.recognition.clone());
        let recognizer_state = recognizer.state_handle();
        let recognizer_task = tokio::spawn(recognizer.run(frame_rx, event_tx));

        let dispatcher_task = tokio::spawn(async move {
            let mut dispatcher = dispatcher;
            while let Some(event) = event_rx.recv().await {
                dispatcher.dispatch(&event);
            }
            dispatcher
        });

        Ok(SessionHandle {
            running,
            capture: Some(capture),
            pump: Some(pump),
            recognizer: recognizer_task,
            dispatcher: dispatcher_task,
            recognizer_state,
            stats,
            reporter: self.reporter,
        })
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    running: Arc<AtomicBool>,
    capture: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    recognizer: tokio::task::JoinHandle<Result<()>>,
    dispatcher: tokio::task::JoinHandle<ResultDispatcher>,
    recognizer_state: RecognizerStateHandle,
    stats: Arc<StatsRegistry>,
    reporter: Arc<dyn ErrorReporter>,
}

impl SessionHandle {
    /// Returns true until the session has been stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current recognizer lifecycle state.
    pub fn recognizer_state(&self) -> RecognizerState {
        self.recognizer_state.get()
    }

    /// Per-stage statistics for the status surface.
    pub fn stats(&self) -> Arc<StatsRegistry> {
        Arc::clone(&self.stats)
    }

    /// Stops the session and waits for every stage to drain.
    pub async fn stop(self) -> SessionOutcome {
        self.running.store(false, Ordering::SeqCst);
        self.join().await
    }

    /// Waits for the session to end on its own (finite sources), then
    /// collects the outcome. Equivalent to `stop` once the source is done.
    pub async fn join(mut self) -> SessionOutcome {
        let capture = self.capture.take();
        let pump = self.pump.take();
        let reporter = Arc::clone(&self.reporter);

        // Thread joins block; keep them off the async executor.
        let joiner = tokio::task::spawn_blocking(move || {
            for (stage, handle) in [("capture", capture), ("pump", pump)] {
                if let Some(handle) = handle
                    && handle.join().is_err()
                {
                    reporter.report(stage, &StageError::Fatal("thread panicked".to_string()));
                }
            }
        });
        if joiner.await.is_err() {
            self.reporter
                .report("session", &StageError::Fatal("join task panicked".to_string()));
        }

        let recognition = match self.recognizer.await {
            Ok(result) => result,
            Err(_) => Err(BabelcastError::Other(
                "recognizer task panicked".to_string(),
            )),
        };

        let dispatcher = match self.dispatcher.await {
            Ok(dispatcher) => dispatcher,
            Err(_) => {
                self.reporter.report(
                    "dispatch",
                    &StageError::Fatal("dispatcher task panicked".to_string()),
                );
                ResultDispatcher::new()
            }
        };

        self.running.store(false, Ordering::SeqCst);
        SessionOutcome {
            recognition,
            dispatcher,
        }
    }
}

/// Polls the source, reframes samples to a fixed size, and pushes them onto
/// the queue until the source ends or the session is stopped.
fn capture_loop(
    source: &mut dyn AudioSource,
    queue_tx: &FrameSender,
    running: &AtomicBool,
    audio_stats: &ServiceStats,
    reporter: &dyn ErrorReporter,
    poll_interval: Duration,
    frame_samples: usize,
) {
    const MAX_CONSECUTIVE_ERRORS: u32 = 10;

    let mut pending: Vec<i16> = Vec::new();
    let mut sequence: u64 = 0;
    let mut consecutive_errors: u32 = 0;

    while running.load(Ordering::SeqCst) {
        let samples = match source.read_samples() {
            Ok(samples) => {
                consecutive_errors = 0;
                samples
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    reporter.report(
                        "capture",
                        &StageError::Fatal(format!(
                            "audio capture failed {} times in a row: {}",
                            consecutive_errors, e
                        )),
                    );
                    return;
                }
                reporter.report("capture", &StageError::Recoverable(e.to_string()));
                thread::sleep(poll_interval);
                continue;
            }
        };

        if samples.is_empty() {
            if source.is_finite() {
                break;
            }
            // Live source: empty reads are normal while the device warms up.
            thread::sleep(poll_interval);
            continue;
        }

        pending.extend_from_slice(&samples);
        while pending.len() >= frame_samples {
            let rest = pending.split_off(frame_samples);
            let frame = AudioFrame::new(std::mem::replace(&mut pending, rest), sequence);
            sequence += 1;
            match queue_tx.push(frame) {
                PushOutcome::Accepted => {}
                PushOutcome::DroppedOldest => audio_stats.record_dropped(),
                PushOutcome::Closed => return,
            }
        }
    }

    // Flush the trailing partial frame from a finite source.
    if !pending.is_empty()
        && queue_tx.push(AudioFrame::new(pending, sequence)) == PushOutcome::DroppedOldest
    {
        audio_stats.record_dropped();
    }
}
