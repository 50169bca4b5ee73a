//! Audio Buffer Management
//!
//! Provides the in-memory audio buffer shared by every effect, the analysis
//! routines and the waveform renderer. Audio is kept at its decoded sample
//! rate; nothing is resampled.

use std::ops::Range;

use crate::error::{AuralabError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Convert a duration in milliseconds to a frame count at `sample_rate`
#[inline]
pub fn ms_to_frames(ms: u32, sample_rate: u32) -> usize {
    ((ms as u64 * sample_rate as u64 + 500) / 1000) as usize
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio held as non-interleaved 32-bit float samples
///
/// Each channel is a separate `Vec<f32>`; all channels have the same length.
///
/// # Example
/// ```
/// use auralab::engine::buffer::{AudioBuffer, ChannelLayout};
///
/// // 1 second of stereo silence at 44.1 kHz
/// let buffer = AudioBuffer::new(44100, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new buffer filled with silence
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        let num_channels = layout.num_channels();
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// Fails if the channel count is not mono/stereo or the channels differ in length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if ChannelLayout::from_count(samples.len()).is_none() {
            return Err(AuralabError::UnsupportedFormat {
                format: format!(
                    "{}-channel audio (only mono/stereo supported)",
                    samples.len()
                ),
            });
        }

        let len = samples[0].len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(AuralabError::InvalidAudio {
                reason: "Channels have different lengths".to_string(),
                source: None,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Split interleaved frames (L, R, L, R, ... for stereo) into channels
    ///
    /// Fails when the data doesn't hold a whole number of frames.
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let channels = layout.num_channels();
        if interleaved.len() % channels != 0 {
            return Err(AuralabError::InvalidAudio {
                reason: format!(
                    "{} samples do not form whole {}-channel frames",
                    interleaved.len(),
                    channels
                ),
                source: None,
            });
        }

        let samples = (0..channels)
            .map(|ch| interleaved.iter().skip(ch).step_by(channels).copied().collect())
            .collect();

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Interleave the channels into frames for writing
    pub fn to_interleaved(&self) -> Vec<f32> {
        (0..self.len())
            .flat_map(|i| self.samples.iter().map(move |ch| ch[i]))
            .collect()
    }

    /// Average all channels into a single mono signal
    pub fn to_mono(&self) -> Vec<f32> {
        match self.samples.as_slice() {
            [] => Vec::new(),
            [mono] => mono.clone(),
            channels => {
                let scale = 1.0 / channels.len() as f32;
                (0..self.len())
                    .map(|i| channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
                    .collect()
            }
        }
    }

    /// Copy out a range of frames
    ///
    /// The range is clamped to the buffer, so asking for more than exists
    /// yields whatever is available.
    pub fn slice_frames(&self, range: Range<usize>) -> AudioBuffer {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);

        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Number of frames covering `ms` milliseconds at this buffer's rate
    #[inline]
    pub fn frames_for_ms(&self, ms: u32) -> usize {
        ms_to_frames(ms, self.sample_rate)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: RATE,
        }
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!(db_to_linear(-120.0) < 1e-5);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_ms_to_frames() {
        assert_eq!(ms_to_frames(1000, 44100), 44100);
        assert_eq!(ms_to_frames(2000, 8000), 16000);
        // 10 ms at 22050 Hz = 220.5 frames, rounded
        assert_eq!(ms_to_frames(10, 22050), 221);
        assert_eq!(ms_to_frames(0, 48000), 0);
    }

    #[test]
    fn test_channel_layout() {
        assert_eq!(ChannelLayout::Mono.num_channels(), 1);
        assert_eq!(ChannelLayout::Stereo.num_channels(), 2);
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    #[test]
    fn test_buffer_new() {
        let buffer = AudioBuffer::new(1000, ChannelLayout::Stereo, RATE);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.sample_rate, RATE);
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer::new(RATE as usize * 3, ChannelLayout::Mono, RATE);
        assert!((buffer.duration_secs() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_channels_rejects_surround() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 4]; 6], RATE);
        assert!(matches!(
            result,
            Err(AuralabError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_from_channels_rejects_ragged() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 4], vec![0.0; 3]], RATE);
        assert!(matches!(result, Err(AuralabError::InvalidAudio { .. })));
    }

    #[test]
    fn test_buffer_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, ChannelLayout::Stereo, RATE).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.samples[0], vec![0.1, 0.3, 0.5]);
        assert_eq!(buffer.samples[1], vec![0.2, 0.4, 0.6]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_from_interleaved_invalid() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let result = AudioBuffer::from_interleaved(&interleaved, ChannelLayout::Stereo, RATE);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let buffer = create_test_buffer(vec![vec![1.0, 0.0, -1.0], vec![0.0, 0.5, -1.0]]);
        assert_eq!(buffer.to_mono(), vec![0.5, 0.25, -1.0]);
    }

    #[test]
    fn test_slice_frames_clamps() {
        let buffer = create_test_buffer(vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]]);

        assert_eq!(buffer.slice_frames(1..3).samples[0], vec![1.0, 2.0]);
        // Beyond the end yields what is there
        assert_eq!(buffer.slice_frames(3..100).samples[0], vec![3.0, 4.0]);
        assert!(buffer.slice_frames(10..20).is_empty());
    }
}
