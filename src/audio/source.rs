//! Audio source trait and frame type.

use crate::defaults;
use crate::error::{BabelcastError, Result};
use std::time::Instant;

/// A frame of raw PCM audio with ordering metadata.
///
/// Created once by the audio source, consumed exactly once downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// PCM samples (16-bit signed integers, mono).
    pub samples: Vec<i16>,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
    /// Timestamp when this frame was captured.
    pub timestamp: Instant,
}

impl AudioFrame {
    /// Creates a new audio frame stamped with the current time.
    pub fn new(samples: Vec<i16>, sequence: u64) -> Self {
        Self {
            samples,
            sequence,
            timestamp: Instant::now(),
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }

    /// Serializes the samples as little-endian bytes for wire transport.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|&s| s.to_le_bytes())
            .collect()
    }
}

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real device, WAV file, mock).
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    ///
    /// Starting a source that is already active fails with `DeviceBusy`.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio and release the device.
    fn stop(&mut self) -> Result<()>;

    /// Read available audio samples from the source.
    ///
    /// An empty result from a live source means no samples yet; from a finite
    /// source it means end-of-stream.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Returns true for sources that end (files, pipes) rather than
    /// capturing live until stopped.
    fn is_finite(&self) -> bool {
        false
    }
}

/// A scripted phase of mock audio output.
#[derive(Debug, Clone)]
pub struct FramePhase {
    /// Samples returned by each read in this phase.
    pub samples: Vec<i16>,
    /// Number of reads this phase lasts.
    pub count: u32,
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    started: bool,
    phases: Vec<FramePhase>,
    phase_index: usize,
    reads_in_phase: u32,
    finite: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            started: false,
            phases: vec![FramePhase {
                samples: vec![0i16; defaults::FRAME_SAMPLES],
                count: u32::MAX,
            }],
            phase_index: 0,
            reads_in_phase: 0,
            finite: true,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to play a sequence of phases, then end.
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases = phases;
        self.phase_index = 0;
        self.reads_in_phase = 0;
        self
    }

    /// Configure the mock to emit the same samples forever (live source).
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.phases = vec![FramePhase {
            samples,
            count: u32::MAX,
        }];
        self
    }

    /// Mark this mock as a live source (empty reads mean "not yet").
    pub fn as_live_source(mut self) -> Self {
        self.finite = false;
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(BabelcastError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        if self.started {
            return Err(BabelcastError::DeviceBusy {
                device: "mock".to_string(),
            });
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(BabelcastError::AudioCapture {
                message: self.error_message.clone(),
            });
        }

        while self.phase_index < self.phases.len() {
            let phase = &self.phases[self.phase_index];
            if self.reads_in_phase < phase.count {
                self.reads_in_phase += 1;
                return Ok(phase.samples.clone());
            }
            self.phase_index += 1;
            self.reads_in_phase = 0;
        }

        // Sequence exhausted — end-of-stream for finite sources.
        Ok(Vec::new())
    }

    fn is_finite(&self) -> bool {
        self.finite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration() {
        let frame = AudioFrame::new(vec![0i16; 16000], 0);
        assert_eq!(frame.duration_ms(16000), 1000);
    }

    #[test]
    fn frame_le_bytes_roundtrip() {
        let frame = AudioFrame::new(vec![1i16, -2, 300], 0);
        let bytes = frame.to_le_bytes();
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 1);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -2);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 300);
    }

    #[test]
    fn mock_returns_configured_samples() {
        let samples = vec![100i16, 200, 300];
        let mut source = MockAudioSource::new().with_samples(samples.clone());
        assert_eq!(source.read_samples().unwrap(), samples);
        assert_eq!(source.read_samples().unwrap(), samples);
    }

    #[test]
    fn mock_frame_sequence_plays_phases_then_ends() {
        let mut source = MockAudioSource::new().with_frame_sequence(vec![
            FramePhase {
                samples: vec![1i16; 4],
                count: 2,
            },
            FramePhase {
                samples: vec![2i16; 4],
                count: 1,
            },
        ]);

        assert_eq!(source.read_samples().unwrap(), vec![1i16; 4]);
        assert_eq!(source.read_samples().unwrap(), vec![1i16; 4]);
        assert_eq!(source.read_samples().unwrap(), vec![2i16; 4]);
        assert!(source.read_samples().unwrap().is_empty());
        assert!(source.read_samples().unwrap().is_empty());
    }

    #[test]
    fn mock_start_twice_is_device_busy() {
        let mut source = MockAudioSource::new();
        source.start().unwrap();

        match source.start() {
            Err(BabelcastError::DeviceBusy { device }) => assert_eq!(device, "mock"),
            other => panic!("Expected DeviceBusy, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn mock_stop_releases_device_for_restart() {
        let mut source = MockAudioSource::new();
        source.start().unwrap();
        source.stop().unwrap();
        assert!(source.start().is_ok());
    }

    #[test]
    fn mock_start_failure() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device not found");

        match source.start() {
            Err(BabelcastError::AudioCapture { message }) => {
                assert_eq!(message, "device not found");
            }
            other => panic!("Expected AudioCapture, got {:?}", other.map(|_| ())),
        }
        assert!(!source.is_started());
    }

    #[test]
    fn mock_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn mock_live_source_is_not_finite() {
        let source = MockAudioSource::new().as_live_source();
        assert!(!source.is_finite());
        assert!(MockAudioSource::new().is_finite());
    }

    #[test]
    fn audio_source_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_samples(vec![1i16, 2, 3]));
        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap(), vec![1i16, 2, 3]);
        source.stop().unwrap();
    }
}
