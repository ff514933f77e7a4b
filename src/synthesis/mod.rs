//! Speech synthesis: provider boundary and playback-composing client.

pub mod client;
pub mod provider;

pub use client::{SynthesisClient, SynthesisConfig};
pub use provider::{
    HttpSynthesisProvider, MockSynthesisProvider, SynthesisProvider, SynthesisRequest, VoiceGender,
};
