//! Real microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{BabelcastError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed behind the Mutex in CpalAudioSource,
/// so it never crosses thread boundaries unsynchronized.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// List available audio input device names.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| BabelcastError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// List available audio output device names (for speaker assignment).
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| BabelcastError::AudioCapture {
            message: format!("Failed to enumerate output devices: {}", e),
        })?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Microphone capture via CPAL, producing 16-bit PCM at 16kHz mono.
///
/// Holds exclusive ownership of the input device while active; a second
/// `start()` without an intervening `stop()` fails with `DeviceBusy`.
pub struct CpalAudioSource {
    device: cpal::Device,
    device_name: String,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Create a capture source for the named device, or the system default.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let devices = host
                .input_devices()
                .map_err(|e| BabelcastError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;

            devices
                .into_iter()
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| BabelcastError::AudioDeviceNotFound {
                    device: name.to_string(),
                })?
        } else {
            host.default_input_device()
                .ok_or_else(|| BabelcastError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        Ok(Self {
            device,
            device_name,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Build the input stream, preferring i16/16kHz/mono with an f32 fallback
    /// for devices that only expose float formats.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("babelcast: audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| BabelcastError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|_| BabelcastError::AudioCapture {
            message: "stream lock poisoned".to_string(),
        })?;

        if guard.is_some() {
            return Err(BabelcastError::DeviceBusy {
                device: self.device_name.clone(),
            });
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| BabelcastError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        *guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|_| BabelcastError::AudioCapture {
            message: "stream lock poisoned".to_string(),
        })?;
        *guard = None;

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buf = self.buffer.lock().map_err(|_| BabelcastError::AudioCapture {
            message: "buffer lock poisoned".to_string(),
        })?;
        Ok(std::mem::take(&mut *buf))
    }
}
