//! Streaming speech recognition: provider boundary and client state machine.
//!
//! ```text
//! ┌────────────┐  frames  ┌───────────────────┐  events  ┌────────────┐
//! │ FrameQueue │─────────▶│ StreamingRecognizer│────────▶│ Dispatcher │
//! └────────────┘          │  (rotates provider │          └────────────┘
//!                         │   streams, retries)│
//!                         └───────────────────┘
//! ```

pub mod client;
pub mod provider;
pub mod types;

pub use client::StreamingRecognizer;
pub use provider::{
    MockRecognitionProvider, ProviderStream, RecognitionProvider, SessionScript,
    TcpRecognitionProvider,
};
pub use types::{RecognitionConfig, RecognitionEvent, RecognizerState, StreamEvent};
