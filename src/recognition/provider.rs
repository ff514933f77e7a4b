//! Recognition provider boundary.
//!
//! A provider accepts an ordered stream of PCM frames and returns an ordered
//! stream of recognition events. One frame does not map to one event: zero,
//! one, or many events can arrive per frame sent.

use crate::audio::source::AudioFrame;
use crate::error::{BabelcastError, Result};
use crate::recognition::types::{RecognitionConfig, RecognitionEvent, StreamEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One open provider stream: a writer for audio and a channel of events.
///
/// Dropping `audio_tx` signals end-of-input; the provider then delivers any
/// trailing events followed by `StreamEvent::Closed`.
pub struct ProviderStream {
    pub audio_tx: mpsc::Sender<AudioFrame>,
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Opaque streaming recognition service.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Opens a new streaming session.
    async fn open_stream(&self, config: &RecognitionConfig) -> Result<ProviderStream>;
}

// ── TCP provider ─────────────────────────────────────────────────────────

/// Wire format of one line from the recognition server.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "final")]
    is_final: bool,
    confidence: Option<f32>,
    /// Out-of-band status: "expired" when the session hit its duration limit.
    status: Option<String>,
}

/// Opening handshake sent to the recognition server.
#[derive(Debug, Serialize)]
struct WireConfig<'a> {
    language: &'a str,
    sample_rate: u32,
    interim_results: bool,
}

/// Recognition provider speaking newline-delimited JSON over TCP.
///
/// Audio is written as raw little-endian 16-bit PCM after a single JSON
/// config line; results come back one JSON object per line.
pub struct TcpRecognitionProvider {
    addr: String,
}

impl TcpRecognitionProvider {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
        }
    }
}

#[async_trait]
impl RecognitionProvider for TcpRecognitionProvider {
    async fn open_stream(&self, config: &RecognitionConfig) -> Result<ProviderStream> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let stream = tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|e| BabelcastError::RecognitionUnavailable {
                message: format!("connect to {} failed: {}", self.addr, e),
            })?;
        stream
            .set_nodelay(true)
            .map_err(|e| BabelcastError::RecognitionUnavailable {
                message: format!("socket setup failed: {}", e),
            })?;

        let (read_half, mut write_half) = stream.into_split();

        // Handshake: one JSON line describing the session.
        let handshake = serde_json::to_string(&WireConfig {
            language: &config.language,
            sample_rate: config.sample_rate,
            interim_results: config.interim_results,
        })
        .map_err(|e| BabelcastError::RecognitionUnavailable {
            message: format!("handshake encode failed: {}", e),
        })?;
        let mut handshake_line = handshake.into_bytes();
        handshake_line.push(b'\n');
        write_half
            .write_all(&handshake_line)
            .await
            .map_err(|e| BabelcastError::RecognitionUnavailable {
                message: format!("handshake write failed: {}", e),
            })?;

        let (audio_tx, mut audio_rx) = mpsc::channel::<AudioFrame>(crate::defaults::CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(crate::defaults::CHANNEL_CAPACITY);

        // Writer: forward frames as raw PCM; shut down the write side on
        // end-of-input so the server knows to flush and close.
        tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                if write_half.write_all(&frame.to_le_bytes()).await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        // Reader: one JSON event per line until EOF.
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.is_empty() {
                            continue;
                        }
                        let event = match serde_json::from_str::<WireEvent>(&line) {
                            Ok(wire) => wire_to_event(wire),
                            Err(e) => StreamEvent::Error(format!("malformed event: {}", e)),
                        };
                        let terminal = !matches!(event, StreamEvent::Recognition(_));
                        if event_tx.send(event).await.is_err() || terminal {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = event_tx.send(StreamEvent::Closed).await;
                        break;
                    }
                    Err(e) => {
                        let _ = event_tx.send(StreamEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        Ok(ProviderStream {
            audio_tx,
            events: event_rx,
        })
    }
}

fn wire_to_event(wire: WireEvent) -> StreamEvent {
    match wire.status.as_deref() {
        Some("expired") => StreamEvent::Expired,
        Some("closed") => StreamEvent::Closed,
        Some(other) => StreamEvent::Error(format!("unknown status: {}", other)),
        None => {
            let mut event = if wire.is_final {
                RecognitionEvent::finalized(&wire.text, wire.confidence.unwrap_or(0.0))
            } else {
                RecognitionEvent::interim(&wire.text)
            };
            event.confidence = wire.confidence;
            StreamEvent::Recognition(event)
        }
    }
}

// ── Mock provider ────────────────────────────────────────────────────────

/// One step of a scripted mock session.
#[derive(Debug, Clone)]
enum ScriptStep {
    /// Wait until this many more frames have arrived.
    AwaitFrames(usize),
    /// Emit an event.
    Emit(StreamEvent),
}

/// Scripted behavior of one mock provider stream.
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    steps: Vec<ScriptStep>,
}

impl SessionScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `n` audio frames before the next event.
    pub fn await_frames(mut self, n: usize) -> Self {
        self.steps.push(ScriptStep::AwaitFrames(n));
        self
    }

    /// Emit an interim result.
    pub fn interim(mut self, text: &str) -> Self {
        self.steps.push(ScriptStep::Emit(StreamEvent::Recognition(
            RecognitionEvent::interim(text),
        )));
        self
    }

    /// Emit a final result.
    pub fn finalized(mut self, text: &str, confidence: f32) -> Self {
        self.steps.push(ScriptStep::Emit(StreamEvent::Recognition(
            RecognitionEvent::finalized(text, confidence),
        )));
        self
    }

    /// End the stream with a session-expired signal.
    pub fn expire(mut self) -> Self {
        self.steps.push(ScriptStep::Emit(StreamEvent::Expired));
        self
    }

    /// End the stream with a transport error.
    pub fn error(mut self, message: &str) -> Self {
        self.steps
            .push(ScriptStep::Emit(StreamEvent::Error(message.to_string())));
        self
    }
}

/// Mock recognition provider driven by per-session scripts.
///
/// Each `open_stream` consumes the next queued script; when the scripts run
/// out, sessions silently consume audio and close on end-of-input. A `None`
/// entry in the queue makes that `open_stream` call fail.
pub struct MockRecognitionProvider {
    scripts: Arc<Mutex<VecDeque<Option<SessionScript>>>>,
    opens: Arc<AtomicUsize>,
    open_failures: Arc<AtomicUsize>,
}

impl MockRecognitionProvider {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            opens: Arc::new(AtomicUsize::new(0)),
            open_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a script for the next opened session.
    pub fn with_session(self, script: SessionScript) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(Some(script));
        }
        self
    }

    /// Queue an `open_stream` failure at this position, after any earlier
    /// queued sessions have been consumed.
    pub fn with_failed_open(self) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(None);
        }
        self
    }

    /// Fail the first `n` calls to `open_stream`.
    pub fn with_open_failures(self, n: usize) -> Self {
        self.open_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Number of sessions opened so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognitionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionProvider for MockRecognitionProvider {
    async fn open_stream(&self, _config: &RecognitionConfig) -> Result<ProviderStream> {
        if self
            .open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BabelcastError::RecognitionUnavailable {
                message: "mock open failure".to_string(),
            });
        }

        let script = match self.scripts.lock().ok().and_then(|mut s| s.pop_front()) {
            Some(Some(script)) => script,
            Some(None) => {
                return Err(BabelcastError::RecognitionUnavailable {
                    message: "mock scripted open failure".to_string(),
                });
            }
            None => SessionScript::default(),
        };

        self.opens.fetch_add(1, Ordering::SeqCst);

        let (audio_tx, mut audio_rx) = mpsc::channel::<AudioFrame>(64);
        let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(64);

        tokio::spawn(async move {
            for step in script.steps {
                match step {
                    ScriptStep::AwaitFrames(n) => {
                        for _ in 0..n {
                            if audio_rx.recv().await.is_none() {
                                // Input ended early; remaining events still fire.
                                break;
                            }
                        }
                    }
                    ScriptStep::Emit(event) => {
                        let terminal = !matches!(event, StreamEvent::Recognition(_));
                        if event_tx.send(event).await.is_err() || terminal {
                            return;
                        }
                    }
                }
            }

            // Script exhausted: absorb remaining audio, then close cleanly.
            while audio_rx.recv().await.is_some() {}
            let _ = event_tx.send(StreamEvent::Closed).await;
        });

        Ok(ProviderStream {
            audio_tx,
            events: event_rx,
        })
    }
}
