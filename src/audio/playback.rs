//! Audio playback devices and dual-speaker playback.
//!
//! Each playback runs in its own failure domain: stopping or losing one
//! output device never blocks or crashes another.

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Handle to an in-flight playback.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    active: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl PlaybackHandle {
    /// Creates a handle pair shared with the playback worker.
    pub(crate) fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests the playback to stop. Idempotent; never blocks.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Returns true while audio is still being played.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_finished(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Blocks until the playback finishes or the timeout elapses.
    /// Returns true if the playback finished.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.is_active() {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

/// Trait for audio output devices.
///
/// `play` starts playback in the background and returns immediately with a
/// handle; it does not wait for the audio to finish.
pub trait PlaybackDevice: Send + Sync {
    /// Name of the underlying output device.
    fn device_name(&self) -> &str;

    /// Begin playback of encoded audio (WAV).
    fn play(&self, audio: &[u8]) -> Result<PlaybackHandle>;
}

/// Starts playback on two devices concurrently.
///
/// Returns once both playbacks have been issued, not once they finish.
/// The two results are independent: a failure to start one playback does not
/// stop or undo the other.
pub fn play_dual(
    device_a: &dyn PlaybackDevice,
    audio_a: &[u8],
    device_b: &dyn PlaybackDevice,
    audio_b: &[u8],
) -> (Result<PlaybackHandle>, Result<PlaybackHandle>) {
    let a = device_a.play(audio_a);
    let b = device_b.play(audio_b);
    (a, b)
}

/// Mock playback device for testing.
///
/// "Plays" for a duration proportional to the audio length, honoring stop
/// requests, without touching any hardware.
pub struct MockPlaybackDevice {
    name: String,
    ms_per_byte: u64,
    should_fail: bool,
}

impl MockPlaybackDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ms_per_byte: 1,
            should_fail: false,
        }
    }

    /// Configure the simulated playback speed.
    pub fn with_ms_per_byte(mut self, ms: u64) -> Self {
        self.ms_per_byte = ms;
        self
    }

    /// Configure the mock to fail when playback is started.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl PlaybackDevice for MockPlaybackDevice {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn play(&self, audio: &[u8]) -> Result<PlaybackHandle> {
        if self.should_fail {
            return Err(crate::error::BabelcastError::AudioPlayback {
                message: format!("mock device '{}' failed to open", self.name),
            });
        }

        let handle = PlaybackHandle::new();
        let worker = handle.clone();
        let total = Duration::from_millis(audio.len() as u64 * self.ms_per_byte);

        thread::spawn(move || {
            let step = Duration::from_millis(5);
            let deadline = std::time::Instant::now() + total;
            while std::time::Instant::now() < deadline {
                if worker.stop_requested() {
                    break;
                }
                thread::sleep(step);
            }
            worker.mark_finished();
        });

        Ok(handle)
    }
}

/// Real playback through a CPAL output device.
#[cfg(feature = "cpal-audio")]
pub use cpal_playback::CpalPlaybackDevice;

#[cfg(feature = "cpal-audio")]
mod cpal_playback {
    use super::{PlaybackDevice, PlaybackHandle};
    use crate::error::{BabelcastError, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    /// Plays WAV audio through a named CPAL output device (or the default).
    pub struct CpalPlaybackDevice {
        name: String,
        device_name: Option<String>,
    }

    impl CpalPlaybackDevice {
        pub fn new(device_name: Option<&str>) -> Self {
            Self {
                name: device_name.unwrap_or("default").to_string(),
                device_name: device_name.map(str::to_string),
            }
        }

        fn open_device(&self) -> Result<cpal::Device> {
            let host = cpal::default_host();
            match &self.device_name {
                Some(name) => host
                    .output_devices()
                    .map_err(|e| BabelcastError::AudioPlayback {
                        message: format!("Failed to enumerate output devices: {}", e),
                    })?
                    .find(|d| d.name().is_ok_and(|n| &n == name))
                    .ok_or_else(|| BabelcastError::AudioDeviceNotFound {
                        device: name.clone(),
                    }),
                None => {
                    host.default_output_device()
                        .ok_or_else(|| BabelcastError::AudioDeviceNotFound {
                            device: "default".to_string(),
                        })
                }
            }
        }
    }

    impl PlaybackDevice for CpalPlaybackDevice {
        fn device_name(&self) -> &str {
            &self.name
        }

        fn play(&self, audio: &[u8]) -> Result<PlaybackHandle> {
            let mut reader = hound::WavReader::new(Cursor::new(audio.to_vec())).map_err(|e| {
                BabelcastError::AudioPlayback {
                    message: format!("Failed to parse WAV audio: {}", e),
                }
            })?;
            let spec = reader.spec();
            let samples: VecDeque<i16> = reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| BabelcastError::AudioPlayback {
                    message: format!("Failed to read WAV samples: {}", e),
                })?;

            let device = self.open_device()?;
            let handle = PlaybackHandle::new();
            let worker = handle.clone();
            let device_label = self.name.clone();

            // The cpal stream is not Send; it lives entirely on this thread.
            thread::spawn(move || {
                let queue = Arc::new(Mutex::new(samples));
                let callback_queue = Arc::clone(&queue);

                let config = cpal::StreamConfig {
                    channels: spec.channels,
                    sample_rate: cpal::SampleRate(spec.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };

                let stream = device.build_output_stream(
                    &config,
                    move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        let mut queue = match callback_queue.lock() {
                            Ok(q) => q,
                            Err(_) => return,
                        };
                        for sample in out.iter_mut() {
                            *sample = queue.pop_front().unwrap_or(0);
                        }
                    },
                    move |err| {
                        eprintln!("babelcast: playback stream error on {}: {}", device_label, err);
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if stream.play().is_ok() {
                            loop {
                                if worker.stop_requested() {
                                    break;
                                }
                                let remaining =
                                    queue.lock().map(|q| q.len()).unwrap_or(0);
                                if remaining == 0 {
                                    break;
                                }
                                thread::sleep(Duration::from_millis(10));
                            }
                        }
                        drop(stream);
                    }
                    Err(e) => {
                        eprintln!("babelcast: failed to open playback stream: {}", e);
                    }
                }
                worker.mark_finished();
            });

            Ok(handle)
        }
    }
}
