//! Result dispatcher: routes recognition events to downstream sinks.
//!
//! Final results reach every sink; interim results reach interim-capable
//! sinks only and overwrite (never append to) the current interim slot.

use crate::recognition::types::RecognitionEvent;
use crate::stats::ServiceStats;
use std::sync::{Arc, Mutex};

/// Consumer of dispatched recognition results.
///
/// `interim` defaults to a no-op for sinks that only care about finals
/// (translation, statistics).
pub trait TranscriptSink: Send {
    /// A provisional result that will be superseded.
    fn interim(&mut self, _event: &RecognitionEvent) {}

    /// A result the provider guarantees will not change.
    fn finalized(&mut self, event: &RecognitionEvent);

    /// Name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Dispatches an ordered stream of recognition events to registered sinks.
pub struct ResultDispatcher {
    sinks: Vec<Box<dyn TranscriptSink>>,
    current_interim: Option<String>,
    stats: Arc<ServiceStats>,
}

impl ResultDispatcher {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            current_interim: None,
            stats: Arc::new(ServiceStats::new()),
        }
    }

    /// Registers a sink. Finals are delivered in registration order.
    pub fn add_sink(&mut self, sink: Box<dyn TranscriptSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn TranscriptSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Shared dispatcher statistics (finals counted as successes).
    pub fn stats(&self) -> Arc<ServiceStats> {
        Arc::clone(&self.stats)
    }

    /// The interim text currently on display, if any.
    pub fn current_interim(&self) -> Option<&str> {
        self.current_interim.as_deref()
    }

    /// Routes one event. Events must be fed in provider order.
    pub fn dispatch(&mut self, event: &RecognitionEvent) {
        if event.is_final {
            // The final supersedes whatever interim text was showing.
            self.current_interim = None;
            for sink in &mut self.sinks {
                sink.finalized(event);
            }
            self.stats.record_success(event.timestamp.elapsed());
        } else {
            let text = event.text.trim();
            // Empty or unchanged interim text carries no new information.
            if text.is_empty() || self.current_interim.as_deref() == Some(text) {
                return;
            }
            self.current_interim = Some(text.to_string());
            for sink in &mut self.sinks {
                sink.interim(event);
            }
        }
    }
}

impl Default for ResultDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders results to stderr: interim text overwrites in place, finals get
/// their own line with a confidence percentage.
pub struct DisplaySink;

impl TranscriptSink for DisplaySink {
    fn interim(&mut self, event: &RecognitionEvent) {
        eprint!("\r{:<70}", event.text);
    }

    fn finalized(&mut self, event: &RecognitionEvent) {
        eprint!("\r{:70}\r", "");
        match event.confidence {
            Some(confidence) => {
                eprintln!("{} ({:.0}%)", event.text, confidence * 100.0);
            }
            None => eprintln!("{}", event.text),
        }
    }

    fn name(&self) -> &'static str {
        "display"
    }
}

/// Collects results behind shared handles for tests and library use.
pub struct CollectorSink {
    finals: Arc<Mutex<Vec<String>>>,
    interims: Arc<Mutex<Vec<String>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self {
            finals: Arc::new(Mutex::new(Vec::new())),
            interims: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the collected final texts.
    pub fn finals(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.finals)
    }

    /// Handle to the collected interim texts, in display order.
    pub fn interims(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.interims)
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink for CollectorSink {
    fn interim(&mut self, event: &RecognitionEvent) {
        if let Ok(mut interims) = self.interims.lock() {
            interims.push(event.text.clone());
        }
    }

    fn finalized(&mut self, event: &RecognitionEvent) {
        if let Ok(mut finals) = self.finals.lock() {
            finals.push(event.text.clone());
        }
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Forwards final results into a channel, e.g. toward the translation stage.
///
/// Interim results are deliberately not forwarded: only text that will not
/// change is worth a translation request.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<RecognitionEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self { tx }
    }
}

impl TranscriptSink for ChannelSink {
    fn finalized(&mut self, event: &RecognitionEvent) {
        // Receiver gone means the downstream stage shut down first; the
        // dispatcher keeps serving its remaining sinks.
        let _ = self.tx.send(event.clone());
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
