//! Bounded frame queue between audio capture and the network sender.
//!
//! Drop-oldest backpressure: when the queue is full, the oldest frame is
//! evicted to admit the new one. For live speech, recency beats completeness.

use crate::audio::source::AudioFrame;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of a push onto the frame queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame accepted, nothing evicted.
    Accepted,
    /// Frame accepted after evicting the oldest buffered frame.
    DroppedOldest,
    /// The consumer side is gone; the frame was discarded.
    Closed,
}

/// Bounded FIFO of audio frames with drop-oldest overflow behavior.
pub struct FrameQueue;

impl FrameQueue {
    /// Creates a bounded queue of the given capacity.
    ///
    /// Dropping the `FrameSender` closes the queue: blocked `pop()` calls
    /// drain the remaining frames and then observe end-of-stream.
    pub fn bounded(capacity: usize) -> (FrameSender, FrameReceiver) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let sender = FrameSender {
            tx,
            evict_rx: rx.clone(),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sender, FrameReceiver { rx })
    }
}

/// Producer half of the frame queue. Single producer by design.
pub struct FrameSender {
    tx: Sender<AudioFrame>,
    evict_rx: Receiver<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    /// Pushes a frame. If the queue is full, evicts the oldest frame first.
    pub fn push(&self, frame: AudioFrame) -> PushOutcome {
        let mut evicted = false;
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => {
                    return if evicted {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        PushOutcome::DroppedOldest
                    } else {
                        PushOutcome::Accepted
                    };
                }
                Err(TrySendError::Full(f)) => {
                    // Make room by discarding the oldest buffered frame.
                    evicted = self.evict_rx.try_recv().is_ok() || evicted;
                    frame = f;
                }
                Err(TrySendError::Disconnected(_)) => return PushOutcome::Closed,
            }
        }
    }

    /// Number of frames evicted under backpressure so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Closes the queue. Blocked consumers drain, then observe end-of-stream.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer half of the frame queue.
pub struct FrameReceiver {
    rx: Receiver<AudioFrame>,
}

impl FrameReceiver {
    /// Blocks until a frame is available. Returns `None` once the queue is
    /// closed and fully drained.
    pub fn pop(&self) -> Option<AudioFrame> {
        self.rx.recv().ok()
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.rx.try_recv().ok()
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
