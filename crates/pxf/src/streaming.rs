//! The streaming audio decoder: a random-access, chunked
//! reader over an audio frame, modeled as an explicit cursor rather than an
//! iterator, since callers need [`StreamingAudioDecoder::seek`].

use crate::audio::{self, AudioFrameReader};
use crate::binary::bytes_to_bits;
use crate::canvas::RawImageData;
use crate::errors::PxfError;
use crate::metadata::Metadata;

/// The result of [`StreamingAudioDecoder::decode_all`]: every sample of
/// every channel, in one shot.
pub struct FullAudioDecode {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32
}

/// A stateful, single-owner reader over an audio frame's canvases. Not safe
/// for concurrent reads on the same instance; separate instances over
/// separate canvas sets are fully independent.
pub struct StreamingAudioDecoder {
    sample_rate: u32,
    total_samples: u64,
    bits_per_sample: u8,
    metadata: Metadata,
    channel_bits: Vec<Vec<u8>>,
    cursor: u64
}

impl StreamingAudioDecoder {
    /// Open an audio frame spread across `canvases`, given in channel-index
    /// order (channel 0 first). Parses every canvas header up front; sample
    /// data is read back out of the already-decoded cell bits on demand.
    pub fn open(canvases: &[RawImageData]) -> Result<StreamingAudioDecoder, PxfError> {
        let reader = AudioFrameReader::open(canvases)?;
        Self::from_reader(reader)
    }

    fn from_reader(reader: AudioFrameReader) -> Result<StreamingAudioDecoder, PxfError> {
        let channel_bits = reader.channel_payloads.iter().map(|payload| bytes_to_bits(payload)).collect();

        Ok(StreamingAudioDecoder {
            sample_rate: reader.header.sample_rate,
            total_samples: u64::from(reader.header.total_samples),
            bits_per_sample: reader.header.bits_per_sample,
            metadata: reader.metadata,
            channel_bits,
            cursor: 0
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.total_samples as f64 / f64::from(self.sample_rate)
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_bits.len()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Reposition the sample cursor without reparsing any canvas.
    pub fn seek(&mut self, sample_index: u64) {
        self.cursor = sample_index.min(self.total_samples);
    }

    /// Read up to `round(seconds * sample_rate)` samples per channel,
    /// advancing the cursor. Returns shorter buffers at end of stream; an
    /// empty buffer signals EOF.
    pub fn decode_chunk(&mut self, seconds: f64) -> Vec<Vec<f32>> {
        let requested = (seconds * f64::from(self.sample_rate)).round().max(0.0) as u64;
        let start = self.cursor;
        let end = (start + requested).min(self.total_samples);
        self.cursor = end;

        self.decode_range(start, end)
    }

    /// Decode every sample of every channel, independent of the cursor's
    /// current position. Guaranteed to match the concatenation of
    /// successive [`Self::decode_chunk`] calls starting from sample 0.
    pub fn decode_all(&self) -> FullAudioDecode {
        FullAudioDecode {
            channels: self.decode_range(0, self.total_samples),
            sample_rate: self.sample_rate
        }
    }

    fn decode_range(&self, start: u64, end: u64) -> Vec<Vec<f32>> {
        let bps = usize::from(self.bits_per_sample);

        self.channel_bits
            .iter()
            .map(|bits| {
                let mut samples = Vec::with_capacity((end - start) as usize);
                for i in start..end {
                    let bit_start = i as usize * bps;
                    let bit_end = bit_start + bps;
                    if bit_end > bits.len() {
                        break;
                    }
                    let q = bits[bit_start..bit_end].iter().fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit));
                    samples.push(audio::dequantize_sample(q, self.bits_per_sample));
                }
                samples
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioEncoder;
    use crate::options::EncodeOptions;

    fn sine(n: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..n).map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin()).collect()
    }

    #[test]
    fn chunked_decode_matches_decode_all() {
        let samples = sine(1000, 440.0, 8000.0);
        let metadata = Metadata::new();
        let options = EncodeOptions::default();
        let canvases = AudioEncoder::encode(&[samples], 8000, &metadata, &options, Some(16)).unwrap();

        let mut streaming = StreamingAudioDecoder::open(&canvases).unwrap();
        let full = streaming.decode_all();

        let mut chunked = Vec::new();
        streaming.seek(0);
        loop {
            let chunk = streaming.decode_chunk(0.05);
            if chunk[0].is_empty() {
                break;
            }
            chunked.extend_from_slice(&chunk[0]);
        }

        assert_eq!(chunked, full.channels[0]);
    }

    #[test]
    fn seek_repositions_without_reparsing() {
        let samples = sine(800, 220.0, 8000.0);
        let metadata = Metadata::new();
        let options = EncodeOptions::default();
        let canvases = AudioEncoder::encode(&[samples.clone()], 8000, &metadata, &options, Some(16)).unwrap();

        let mut streaming = StreamingAudioDecoder::open(&canvases).unwrap();
        streaming.seek(400);
        let chunk = streaming.decode_chunk(0.05); // 400 samples at 8kHz
        assert_eq!(chunk[0].len(), 400);

        for (a, b) in samples[400..800].iter().zip(chunk[0].iter()) {
            assert!((a - b).abs() <= 2.0f32.powi(-14));
        }
    }

    #[test]
    fn decode_past_eof_returns_empty() {
        let samples = vec![0.0f32; 10];
        let metadata = Metadata::new();
        let options = EncodeOptions::default();
        let canvases = AudioEncoder::encode(&[samples], 8000, &metadata, &options, Some(8)).unwrap();

        let mut streaming = StreamingAudioDecoder::open(&canvases).unwrap();
        streaming.seek(10);
        let chunk = streaming.decode_chunk(1.0);
        assert!(chunk[0].is_empty());
    }
}
