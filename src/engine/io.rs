//! Audio file I/O for Auralab
//!
//! Imports WAV through hound and every other container (MP3 first of all)
//! through symphonia. The container is sniffed from the file header, so an
//! upload saved under the wrong extension still decodes. Exports are always
//! WAV at the buffer's own sample rate.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{AuralabError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24 (integer PCM) or 32 (float) (default: 24)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer PCM
    pub fn pcm16() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 32-bit float
    pub fn float32() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Import an audio file into an [`AudioBuffer`]
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file cannot be decoded
/// * `UnsupportedFormat` - If the audio has more than 2 channels
/// * `EmptyAudio` - If decoding produced no samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(AuralabError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let (interleaved, channels, sample_rate) = if is_wav(path)? {
        decode_wav(path)?
    } else {
        decode_with_symphonia(path)?
    };

    let layout =
        ChannelLayout::from_count(channels).ok_or_else(|| AuralabError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        })?;

    if interleaved.len() < channels {
        return Err(AuralabError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, layout, sample_rate)?;
    debug!(
        "Imported {}: {} ch, {} Hz, {:.3}s",
        path.display(),
        buffer.channels(),
        buffer.sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Export an AudioBuffer to a WAV file at the buffer's sample rate
///
/// Samples are clamped to [-1.0, 1.0] when written as integer PCM.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    if buffer.channels() == 0 {
        return Err(AuralabError::EmptyAudio);
    }

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AuralabError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut writer = WavWriter::create(path, spec).map_err(|e| write_error(path, e))?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer
                    .write_sample(scaled)
                    .map_err(|e| write_error(path, e))?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer
                    .write_sample(scaled)
                    .map_err(|e| write_error(path, e))?;
            }
        }
        32 => {
            for sample in interleaved {
                writer
                    .write_sample(sample)
                    .map_err(|e| write_error(path, e))?;
            }
        }
        _ => {
            return Err(AuralabError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
            });
        }
    }

    writer.finalize().map_err(|e| write_error(path, e))?;
    debug!("Exported {} ({}-bit)", path.display(), format.bit_depth);

    Ok(())
}

/// Generate a mono sine test tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = 0.5 * (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer {
        samples: vec![
            left.samples.into_iter().next().unwrap_or_default(),
            right.samples.into_iter().next().unwrap_or_default(),
        ],
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// RIFF/WAVE header check on the first 12 bytes
fn is_wav(path: &Path) -> Result<bool> {
    let file = File::open(path).map_err(|e| AuralabError::FileNotFound {
        path: path.display().to_string(),
        source: Some(e),
    })?;

    let mut header = Vec::with_capacity(12);
    file.take(12).read_to_end(&mut header)?;

    Ok(header.len() == 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE")
}

/// Decode a WAV file into interleaved f32, channel count and sample rate
fn decode_wav(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let reader = WavReader::open(path).map_err(|e| AuralabError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    Ok((samples, spec.channels as usize, spec.sample_rate))
}

/// Decode any container symphonia can probe
fn decode_with_symphonia(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_error("Failed to probe format", e))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AuralabError::InvalidAudio {
            reason: "No audio track found".to_string(),
            source: None,
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error("Failed to create decoder", e))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count());
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_error("Error reading packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(decode_error("Decode error", e)),
        };

        let spec = *decoded.spec();
        sample_rate = Some(spec.rate);
        channels = Some(spec.channels.count());

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let sample_rate = sample_rate.ok_or_else(|| AuralabError::InvalidAudio {
        reason: "Unknown sample rate".to_string(),
        source: None,
    })?;
    let channels = channels.unwrap_or(1);

    Ok((interleaved, channels, sample_rate))
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => {
            return reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| AuralabError::InvalidAudio {
                    reason: format!("Failed to read float samples: {}", e),
                    source: Some(Box::new(e)),
                });
        }
        (SampleFormat::Int, 8) => 128.0,
        (SampleFormat::Int, 16) => 32768.0,
        (SampleFormat::Int, 24) => 8388608.0,
        (SampleFormat::Int, 32) => 2147483648.0,
        (SampleFormat::Int, bits) => {
            return Err(AuralabError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits),
            });
        }
    };

    // hound widens every integer depth to i32
    reader
        .samples::<i32>()
        .map(|s| s.map(|v| (v as f64 / scale) as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| AuralabError::InvalidAudio {
            reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
            source: Some(Box::new(e)),
        })
}

fn decode_error(context: &str, e: SymphoniaError) -> AuralabError {
    AuralabError::InvalidAudio {
        reason: format!("{}: {}", context, e),
        source: Some(Box::new(e)),
    }
}

fn write_error(path: &Path, e: hound::Error) -> AuralabError {
    match e {
        hound::Error::IoError(source) => AuralabError::FileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => AuralabError::FileWrite {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
