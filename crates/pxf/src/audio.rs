//! The audio encoder: quantizes N-channel float PCM into a
//! binary frame per channel, each its own canvas, sharing one macroblock
//! layout so the whole set decodes uniformly.

use pxf_core::bytestream::{ZByteReader, ZByteWriter};

use crate::binary::{bits_to_bytes, bytes_to_bits, canvas_capacity_bits, plan_layout, probe_header};
use crate::canvas::RawImageData;
use crate::cell::{CellReader, CellWriter};
use crate::errors::PxfError;
use crate::frame::{self, CanvasHeader, Flags, CANVAS_HEADER_BITS};
use crate::metadata::Metadata;
use crate::options::EncodeOptions;

/// `u32 sample_rate + u32 total_samples_per_channel + u8 channel_count + u8 bits_per_sample`.
pub const AUDIO_HEADER_BYTES: usize = 10;

pub const DEFAULT_BITS_PER_SAMPLE: u8 = 16;

fn valid_bits_per_sample(bps: u8) -> bool {
    matches!(bps, 8 | 12 | 16)
}

fn quantize_sample(x: f32, bps: u8) -> u32 {
    let max_q = (1u32 << bps) - 1;
    let scaled = (x.clamp(-1.0, 1.0) + 1.0) * (max_q as f32) / 2.0;
    scaled.round().clamp(0.0, max_q as f32) as u32
}

pub(crate) fn dequantize_sample(q: u32, bps: u8) -> f32 {
    let max_q = (1u32 << bps) - 1;
    (q as f32) * 2.0 / (max_q as f32) - 1.0
}

fn push_bits_be(bits: &mut Vec<u8>, value: u32, width: u8) {
    for shift in (0..width).rev() {
        bits.push(((value >> shift) & 1) as u8);
    }
}

fn audio_header_bytes(sample_rate: u32, total_samples: u32, channel_count: u8, bps: u8) -> Vec<u8> {
    let mut w = ZByteWriter::with_capacity(AUDIO_HEADER_BYTES);
    w.write_u32_le(sample_rate);
    w.write_u32_le(total_samples);
    w.write_u8(channel_count);
    w.write_u8(bps);
    w.into_vec()
}

struct AudioHeader {
    sample_rate: u32,
    total_samples: u32,
    channel_count: u8,
    bits_per_sample: u8
}

fn parse_audio_header(bytes: &[u8]) -> Result<AudioHeader, PxfError> {
    let mut r = ZByteReader::new(bytes);
    let sample_rate = r.get_u32_le_err().map_err(|_| PxfError::Truncated)?;
    let total_samples = r.get_u32_le_err().map_err(|_| PxfError::Truncated)?;
    let channel_count = r.get_u8_err().map_err(|_| PxfError::Truncated)?;
    let bits_per_sample = r.get_u8_err().map_err(|_| PxfError::Truncated)?;

    if !valid_bits_per_sample(bits_per_sample) {
        return Err(PxfError::InvalidInput(format!("audio header declares bits_per_sample={bits_per_sample}")));
    }

    Ok(AudioHeader {
        sample_rate,
        total_samples,
        channel_count,
        bits_per_sample
    })
}

pub struct AudioEncoder;

impl AudioEncoder {
    /// Encode `channels[c][i]` (samples in `[-1, 1]`) into one canvas per
    /// channel. `bits_per_sample` defaults to 16 when `None`.
    pub fn encode(
        channels: &[Vec<f32>], sample_rate: u32, metadata: &Metadata, options: &EncodeOptions, bits_per_sample: Option<u8>
    ) -> Result<Vec<RawImageData>, PxfError> {
        if channels.is_empty() {
            return Err(PxfError::InvalidInput("audio requires at least one channel".to_string()));
        }
        if channels.len() > 255 {
            return Err(PxfError::InvalidInput("audio supports at most 255 channels".to_string()));
        }

        let bps = bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE);
        if !valid_bits_per_sample(bps) {
            return Err(PxfError::InvalidInput(format!("bits_per_sample must be 8, 12, or 16, got {bps}")));
        }

        let total_samples = channels[0].len();
        if channels.iter().any(|c| c.len() != total_samples) {
            return Err(PxfError::InvalidInput("every channel must have the same sample count".to_string()));
        }
        if total_samples as u64 > u64::from(u32::MAX) {
            return Err(PxfError::InvalidInput("too many samples per channel".to_string()));
        }

        let metadata_bytes = metadata.encode()?;
        let header_bytes = audio_header_bytes(sample_rate, total_samples as u32, channels.len() as u8, bps);

        let payloads: Vec<Vec<u8>> = channels
            .iter()
            .map(|channel| {
                let mut bits = Vec::with_capacity(total_samples * usize::from(bps));
                for &sample in channel {
                    push_bits_be(&mut bits, quantize_sample(sample, bps), bps);
                }
                bits_to_bytes(&bits)
            })
            .collect();

        let trailers: Vec<Vec<u8>> =
            payloads.iter().map(|payload| frame::build_trailer(payload)).collect::<Result<_, _>>()?;

        let layout = plan_layout(options, metadata_bytes.len(), header_bytes.len(), trailers[0].len());
        if layout.canvas_count > 1 {
            return Err(PxfError::InvalidInput(
                "a single audio channel's payload exceeds max_dim; increase max_dim or shorten the clip".to_string()
            ));
        }

        let canvas_dim = (layout.canvas_side_cells * u64::from(layout.m)) as u32;
        let mut canvases = Vec::with_capacity(channels.len());

        for (index, trailer) in trailers.iter().enumerate() {
            let header = CanvasHeader {
                flags: Flags {
                    compact: layout.mode == crate::cell::Mode::Compact,
                    audio: true,
                    multi_image: channels.len() > 1,
                    checksum: true,
                    redundancy: layout.redundancy
                },
                m: layout.m as u8,
                image_index: index as u8,
                image_count: channels.len() as u8
            };

            let mut canvas = RawImageData::new(canvas_dim, canvas_dim);
            let mut writer = CellWriter::new(&mut canvas, layout.m, layout.mode, layout.redundancy);
            writer.write_bits(&bytes_to_bits(&header.encode()));

            if index == 0 {
                writer.write_bits(&bytes_to_bits(&(metadata_bytes.len() as u16).to_le_bytes()));
                writer.write_bits(&bytes_to_bits(&metadata_bytes));
                writer.write_bits(&bytes_to_bits(&header_bytes));
            } else {
                // Non-zero image indices carry no metadata of their own.
                writer.write_bits(&bytes_to_bits(&0u16.to_le_bytes()));
            }

            writer.write_bits(&bytes_to_bits(trailer));
            writer.finish();
            writer.fill_remaining();

            canvases.push(canvas);
        }

        Ok(canvases)
    }
}

/// Decoded audio, fully materialized. Samples for channel `c`, sample `i`
/// live at `channels[c][i]`.
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
    pub metadata: Metadata,
    pub valid_checksum: bool
}

/// Decode every channel's samples in one pass. For random access and
/// chunked decode, use [`crate::streaming::StreamingAudioDecoder`] instead.
pub fn decode_audio(canvases: &[RawImageData]) -> Result<DecodedAudio, PxfError> {
    let reader = AudioFrameReader::open(canvases)?;

    let mut channels = Vec::with_capacity(reader.channel_payloads.len());
    let mut valid_checksum = true;

    for payload in &reader.channel_payloads {
        let bits = bytes_to_bits(payload);
        let mut samples = Vec::with_capacity(reader.header.total_samples as usize);

        for i in 0..reader.header.total_samples as usize {
            let start = i * usize::from(reader.header.bits_per_sample);
            let end = start + usize::from(reader.header.bits_per_sample);
            if end > bits.len() {
                break;
            }
            let q = bits[start..end].iter().fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit));
            samples.push(dequantize_sample(q, reader.header.bits_per_sample));
        }

        channels.push(samples);
    }

    valid_checksum &= reader.channel_valid_checksum.iter().all(|&v| v);

    Ok(DecodedAudio {
        sample_rate: reader.header.sample_rate,
        channels,
        metadata: reader.metadata,
        valid_checksum
    })
}

/// Shared plumbing for [`decode_audio`] and the streaming decoder: parses
/// every canvas's header and trailer, leaving each channel's raw sample
/// bytes (still packed, not yet dequantized) ready to read from.
pub(crate) struct AudioFrameReader {
    pub(crate) header: AudioHeaderInfo,
    pub(crate) metadata: Metadata,
    pub(crate) channel_payloads: Vec<Vec<u8>>,
    pub(crate) channel_valid_checksum: Vec<bool>
}

pub(crate) struct AudioHeaderInfo {
    pub(crate) sample_rate: u32,
    pub(crate) total_samples: u32,
    pub(crate) bits_per_sample: u8
}

impl AudioFrameReader {
    pub(crate) fn open(canvases: &[RawImageData]) -> Result<AudioFrameReader, PxfError> {
        if canvases.is_empty() {
            return Err(PxfError::BadImageSet("no canvases given".to_string()));
        }

        let (header0, m, mode, redundancy) = probe_header(&canvases[0])?;
        if !header0.flags.audio {
            return Err(PxfError::InvalidInput("canvas set is not an audio frame".to_string()));
        }
        if usize::from(header0.image_count) != canvases.len() {
            return Err(PxfError::BadImageSet(format!(
                "frame header declares {} channels but {} canvases were given",
                header0.image_count,
                canvases.len()
            )));
        }

        let mut metadata = Metadata::new();
        let mut audio_header: Option<AudioHeaderInfo> = None;
        let mut channel_payloads = Vec::with_capacity(canvases.len());
        let mut channel_valid_checksum = Vec::with_capacity(canvases.len());

        for (index, canvas) in canvases.iter().enumerate() {
            let mut reader = CellReader::new(canvas, m, mode, redundancy);
            let header_bits = reader.read_bits(CANVAS_HEADER_BITS);
            let header = CanvasHeader::decode(&bits_to_bytes(&header_bits))?;

            if usize::from(header.image_index) != index {
                return Err(PxfError::BadImageSet(format!(
                    "canvas at position {index} carries image index {}",
                    header.image_index
                )));
            }

            let capacity_bits =
                canvas_capacity_bits(canvas.total_cells(m), u64::from(mode.bits_per_cell()), u64::from(redundancy));
            let mut remaining = capacity_bits.saturating_sub(CANVAS_HEADER_BITS);

            let metadata_len_bits = reader.read_bits(16);
            remaining -= 16;
            let metadata_len = u16::from_le_bytes([
                bits_to_bytes(&metadata_len_bits[0..8])[0],
                bits_to_bytes(&metadata_len_bits[8..16])[0]
            ]);

            if metadata_len > 0 {
                let metadata_bits = reader.read_bits(u64::from(metadata_len) * 8);
                remaining -= u64::from(metadata_len) * 8;
                let metadata_bytes = bits_to_bytes(&metadata_bits);
                let (decoded, consumed) = Metadata::decode(&metadata_bytes)?;
                if consumed != metadata_bytes.len() {
                    return Err(PxfError::BadMetadata("trailing bytes after metadata block".to_string()));
                }
                metadata = decoded;

                let audio_header_bits = reader.read_bits((AUDIO_HEADER_BYTES as u64) * 8);
                remaining -= (AUDIO_HEADER_BYTES as u64) * 8;
                let parsed = parse_audio_header(&bits_to_bytes(&audio_header_bits))?;
                audio_header = Some(AudioHeaderInfo {
                    sample_rate: parsed.sample_rate,
                    total_samples: parsed.total_samples,
                    bits_per_sample: parsed.bits_per_sample
                });
            }

            let trailer_bytes = bits_to_bytes(&reader.read_bits(remaining));
            let parsed_trailer = frame::parse_trailer(&trailer_bytes)?;

            channel_payloads.push(parsed_trailer.payload);
            channel_valid_checksum.push(parsed_trailer.valid_checksum);
        }

        let header = audio_header.ok_or_else(|| PxfError::BadMetadata("image 0 is missing the audio header".to_string()))?;

        Ok(AudioFrameReader {
            header,
            metadata,
            channel_payloads,
            channel_valid_checksum
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..n).map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin()).collect()
    }

    #[test]
    fn mono_audio_round_trips_within_quantization_error() {
        let samples = sine(400, 440.0, 8000.0);
        let metadata = Metadata::new();
        let options = EncodeOptions::default();

        let canvases = AudioEncoder::encode(&[samples.clone()], 8000, &metadata, &options, Some(16)).unwrap();
        assert_eq!(canvases.len(), 1);

        let decoded = decode_audio(&canvases).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels.len(), 1);
        assert!(decoded.valid_checksum);

        for (a, b) in samples.iter().zip(decoded.channels[0].iter()) {
            assert!((a - b).abs() <= 2.0f32.powi(-14), "{a} vs {b}");
        }
    }

    #[test]
    fn two_channel_audio_is_always_multi_image() {
        let ch0 = sine(200, 440.0, 8000.0);
        let ch1 = vec![0.0f32; 200];
        let mut metadata = Metadata::new();
        metadata.insert("filename", "stereo.pxf").unwrap();
        let options = EncodeOptions::default();

        let canvases = AudioEncoder::encode(&[ch0.clone(), ch1.clone()], 8000, &metadata, &options, Some(16)).unwrap();
        assert_eq!(canvases.len(), 2);

        let decoded = decode_audio(&canvases).unwrap();
        assert_eq!(decoded.channels.len(), 2);
        assert_eq!(decoded.channels[0].len(), 200);
        assert_eq!(decoded.channels[1].len(), 200);
        assert_eq!(decoded.metadata.get("filename"), Some("stereo.pxf"));

        for &s in &decoded.channels[1] {
            assert!(s.abs() < 2.0f32.powi(-14));
        }
    }

    #[test]
    fn rejects_mismatched_channel_lengths() {
        let metadata = Metadata::new();
        let options = EncodeOptions::default();
        let result = AudioEncoder::encode(&[vec![0.0; 10], vec![0.0; 5]], 8000, &metadata, &options, None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_invalid_bits_per_sample() {
        let metadata = Metadata::new();
        let options = EncodeOptions::default();
        let result = AudioEncoder::encode(&[vec![0.0; 10]], 8000, &metadata, &options, Some(10));
        assert!(result.is_err());
    }
}
