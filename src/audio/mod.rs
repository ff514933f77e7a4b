//! Audio input and output: capture sources and playback devices.

pub mod playback;
pub mod source;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub mod capture;

pub use playback::{MockPlaybackDevice, PlaybackDevice, PlaybackHandle, play_dual};
pub use source::{AudioFrame, AudioSource, MockAudioSource};
pub use wav::WavAudioSource;

#[cfg(feature = "cpal-audio")]
pub use capture::CpalAudioSource;
