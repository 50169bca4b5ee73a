//! Tempo Change Effect
//!
//! Pitch-preserving time-stretch using WSOLA (Waveform Similarity
//! Overlap-Add). Hann-windowed frames are taken from the input at a rate
//! proportional to the tempo multiplier; each frame position is nudged
//! within a small search window so that it lines up with the natural
//! continuation of the previous frame, then frames are overlap-added at a
//! fixed output hop.
//!
//! Frame positions are chosen once on the mono mix and shared by every
//! channel so stereo images don't drift apart.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dsp::effect::{apply_to_file, Effect};
use crate::engine::AudioBuffer;
use crate::error::{AuralabError, Result};
use crate::impl_effect_common;
use crate::storage::Storage;

/// Analysis frame length in milliseconds
const FRAME_MS: f64 = 50.0;
/// Maximum shift of a frame away from its nominal position, in milliseconds
const SEARCH_MS: f64 = 12.0;
/// Only every n-th sample takes part in the similarity measure
const CORRELATION_STRIDE: usize = 2;
/// Minimum energy threshold to avoid division by near-zero in correlation normalization
const ENERGY_EPSILON: f64 = 1e-12;
/// Output samples whose accumulated window weight is below this are left as-is
const WEIGHT_EPSILON: f32 = 1e-6;

/// Tempo change by a rate multiplier (0.75 = slower, 1.5 = faster)
///
/// Output duration is the input duration divided by `rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStretch {
    rate: f64,
}

impl TimeStretch {
    /// Create a time-stretch; the rate must be finite and positive
    pub fn new(rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AuralabError::invalid_parameter(
                "rate",
                format!("tempo rate must be a positive number, got {}", rate),
            ));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Number of output frames produced for `input_len` input frames
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len as f64 / self.rate).round() as usize
    }

    /// Choose the input start position of every output frame
    ///
    /// Output frame `k` starts at `k * hop - hop`; the first frame begins
    /// before zero so every output sample is covered by two frames.
    fn plan_frames(
        &self,
        mono: &[f32],
        output_len: usize,
        frame_len: usize,
        tolerance: usize,
    ) -> Vec<isize> {
        let hop = frame_len / 2;
        let num_frames = output_len / hop + 2;
        let mut positions = Vec::with_capacity(num_frames);
        let mut previous: Option<isize> = None;

        for k in 0..num_frames {
            let output_start = k as f64 * hop as f64 - hop as f64;
            let nominal = (output_start * self.rate).round() as isize;

            let position = match previous {
                None => nominal,
                Some(prev) => best_match(
                    mono,
                    prev + hop as isize,
                    nominal,
                    tolerance as isize,
                    hop,
                ),
            };

            positions.push(position);
            previous = Some(position);
        }

        positions
    }
}

impl Default for TimeStretch {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl Effect for TimeStretch {
    impl_effect_common!(TimeStretch, "time_stretch", "Tempo Change");

    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let output_len = self.output_len(input.len());
        if input.is_empty() || output_len == 0 {
            return AudioBuffer::from_channels(
                vec![Vec::new(); input.channels().max(1)],
                input.sample_rate,
            );
        }

        let sample_rate = input.sample_rate as f64;
        // Even frame length so two half-overlapping Hann windows sum to one
        let frame_len = (((FRAME_MS / 1000.0 * sample_rate).round() as usize) & !1).max(4);
        let hop = frame_len / 2;
        let tolerance = (SEARCH_MS / 1000.0 * sample_rate).round() as usize;
        let window = hann_window(frame_len);

        debug!(
            "WSOLA rate={} frame={} hop={} tolerance={} in={} out={}",
            self.rate,
            frame_len,
            hop,
            tolerance,
            input.len(),
            output_len
        );

        let positions = self.plan_frames(&input.to_mono(), output_len, frame_len, tolerance);

        let samples = input
            .samples
            .iter()
            .map(|channel| overlap_add(channel, &positions, &window, hop, output_len))
            .collect();

        AudioBuffer::from_channels(samples, input.sample_rate)
    }

    fn file_suffix(&self) -> String {
        rate_suffix(self.rate)
    }

    fn get_params(&self) -> Value {
        json!({ "rate": self.rate })
    }
}

/// File suffix for a tempo rate: the decimal rendering without the dot
///
/// Whole rates keep their `.0`, so 0.75 gives `_075x`, 1.5 gives `_15x`
/// and 2.0 gives `_20x`. Different rates can still share a suffix
/// (1.05 and 10.5); [`ExperimentConfig::validate`] rejects such pairs.
///
/// [`ExperimentConfig::validate`]: crate::config::ExperimentConfig::validate
pub fn rate_suffix(rate: f64) -> String {
    format!("_{:?}x", rate).replace('.', "")
}

/// Change the tempo of a file, saving `<stem>_<rate>x.wav`
///
/// The rate is validated before the file is decoded.
pub fn change_tempo(storage: &mut Storage, src: &Path, rate: f64) -> Result<PathBuf> {
    let stretch = TimeStretch::new(rate)?;
    apply_to_file(storage, src, &stretch)
}

/// Periodic Hann window
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Sample with zero padding outside the signal
#[inline]
fn sample_at(signal: &[f32], index: isize) -> f32 {
    if index < 0 {
        0.0
    } else {
        signal.get(index as usize).copied().unwrap_or(0.0)
    }
}

/// Find the position within `nominal ± tolerance` most similar to `natural`
///
/// Similarity is the cross-correlation over the first `overlap` samples,
/// normalised by the candidate's energy. Ties keep the nominal position.
fn best_match(
    signal: &[f32],
    natural: isize,
    nominal: isize,
    tolerance: isize,
    overlap: usize,
) -> isize {
    let reference: Vec<f32> = (0..overlap)
        .step_by(CORRELATION_STRIDE)
        .map(|i| sample_at(signal, natural + i as isize))
        .collect();

    let score = |candidate: isize| -> f64 {
        let mut dot = 0.0_f64;
        let mut energy = 0.0_f64;
        for (j, &r) in reference.iter().enumerate() {
            let c = sample_at(signal, candidate + (j * CORRELATION_STRIDE) as isize) as f64;
            dot += r as f64 * c;
            energy += c * c;
        }
        if energy < ENERGY_EPSILON {
            0.0
        } else {
            dot / energy.sqrt()
        }
    };

    let mut best = nominal;
    let mut best_score = score(nominal);

    for delta in 1..=tolerance {
        for candidate in [nominal - delta, nominal + delta] {
            let s = score(candidate);
            if s > best_score {
                best_score = s;
                best = candidate;
            }
        }
    }

    best
}

/// Overlap-add windowed input frames at a fixed output hop
fn overlap_add(
    channel: &[f32],
    positions: &[isize],
    window: &[f32],
    hop: usize,
    output_len: usize,
) -> Vec<f32> {
    let mut output = vec![0.0_f32; output_len];
    let mut weights = vec![0.0_f32; output_len];

    for (k, &position) in positions.iter().enumerate() {
        let output_start = k as isize * hop as isize - hop as isize;

        for (i, &w) in window.iter().enumerate() {
            let out_idx = output_start + i as isize;
            if out_idx < 0 {
                continue;
            }
            let out_idx = out_idx as usize;
            if out_idx >= output_len {
                break;
            }
            output[out_idx] += w * sample_at(channel, position + i as isize);
            weights[out_idx] += w;
        }
    }

    for (sample, &weight) in output.iter_mut().zip(&weights) {
        if weight > WEIGHT_EPSILON {
            *sample /= weight;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::analysis::analyze;
    use crate::engine::{generate_stereo_test_tone, generate_test_tone};
    use test_case::test_case;

    const RATE: u32 = 8000;

    /// Zero crossings per second of the middle of a signal
    fn crossing_rate(samples: &[f32], sample_rate: u32) -> f64 {
        let start = samples.len() / 4;
        let end = samples.len() * 3 / 4;
        let crossings = samples[start..end]
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        crossings as f64 / ((end - start) as f64 / sample_rate as f64)
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.5 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn test_rejects_bad_rate(rate: f64) {
        assert!(matches!(
            TimeStretch::new(rate),
            Err(AuralabError::InvalidParameter { .. })
        ));
    }

    #[test_case(0.75, "_075x")]
    #[test_case(1.5, "_15x")]
    #[test_case(1.2, "_12x")]
    #[test_case(2.0, "_20x")]
    #[test_case(1.0, "_10x")]
    fn test_rate_suffix(rate: f64, expected: &str) {
        assert_eq!(rate_suffix(rate), expected);
        assert_eq!(TimeStretch::new(rate).unwrap().file_suffix(), expected);
    }

    #[test_case(0.75, 4.0 ; "slow")]
    #[test_case(1.5, 2.0 ; "fast")]
    #[test_case(1.2, 2.5 ; "combined rate")]
    #[test_case(1.0, 3.0 ; "unity")]
    fn test_output_duration(rate: f64, expected_secs: f64) {
        let input = generate_test_tone(220.0, 3.0, RATE);
        let output = TimeStretch::new(rate).unwrap().process(&input).unwrap();

        assert!(
            (output.duration_secs() - expected_secs).abs() < 0.01,
            "rate {} gave {:.3}s",
            rate,
            output.duration_secs()
        );
    }

    #[test]
    fn test_pitch_is_preserved() {
        let input = generate_test_tone(200.0, 2.0, RATE);
        let input_rate = crossing_rate(&input.samples[0], RATE);

        for rate in [0.75, 1.5] {
            let output = TimeStretch::new(rate).unwrap().process(&input).unwrap();
            let output_rate = crossing_rate(&output.samples[0], RATE);
            assert!(
                (output_rate - input_rate).abs() / input_rate < 0.05,
                "rate {}: {} vs {} crossings/s",
                rate,
                output_rate,
                input_rate
            );
        }
    }

    #[test]
    fn test_level_is_preserved() {
        let input = generate_test_tone(200.0, 2.0, RATE);
        let output = TimeStretch::new(0.75).unwrap().process(&input).unwrap();

        let before = analyze(&input);
        let after = analyze(&output);
        assert!((after.rms - before.rms).abs() / before.rms < 0.1);
        assert!(after.peak <= before.peak * 1.05);
    }

    #[test]
    fn test_stereo_channels_stay_separate() {
        let input = generate_stereo_test_tone(200.0, 400.0, 1.0, RATE);
        let output = TimeStretch::new(1.5).unwrap().process(&input).unwrap();

        assert_eq!(output.channels(), 2);
        assert_eq!(output.len(), TimeStretch::new(1.5).unwrap().output_len(input.len()));
        let left = crossing_rate(&output.samples[0], RATE);
        let right = crossing_rate(&output.samples[1], RATE);
        assert!(right > left * 1.8);
    }

    #[test]
    fn test_short_input() {
        let input = generate_test_tone(200.0, 0.01, RATE);
        let output = TimeStretch::new(0.5).unwrap().process(&input).unwrap();
        assert_eq!(output.len(), input.len() * 2);
    }

    #[test]
    fn test_empty_input() {
        let input = AudioBuffer::from_channels(vec![Vec::new()], RATE).unwrap();
        let output = TimeStretch::new(1.5).unwrap().process(&input).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_hann_windows_sum_to_one() {
        let window = hann_window(8);
        for i in 0..4 {
            assert!((window[i] + window[i + 4] - 1.0).abs() < 1e-6);
        }
    }
}
