//! Top-level orchestration: `encode`, `load`,
//! `decode_metadata_only`, and `decode`. Everything here is a thin wrapper
//! over [`crate::binary`], [`crate::audio`], and [`crate::streaming`] — no
//! new algorithms live in this module.

use crate::audio::AudioEncoder;
use crate::binary::{self, DecodeHealth, PxfDecoder, PxfEncoder};
use crate::canvas::RawImageData;
use crate::errors::PxfError;
use crate::metadata::Metadata;
use crate::options::EncodeOptions;
use crate::streaming::StreamingAudioDecoder;

/// A progress callback, polled once per canvas produced or consumed. An
/// error return aborts the operation; such errors propagate unchanged and
/// the operation's partial state is not reusable.
pub type ProgressFn<'a> = dyn FnMut(u8) -> Result<(), PxfError> + 'a;

fn report(progress: Option<&mut ProgressFn<'_>>, percent: u8) -> Result<(), PxfError> {
    if let Some(callback) = progress {
        callback(percent)?;
    }
    Ok(())
}

/// The caller's encode request: exactly one of audio or binary.
pub enum Input<'a> {
    Audio {
        channels: &'a [Vec<f32>],
        sample_rate: u32,
        bits_per_sample: Option<u8>
    },
    Binary {
        data: &'a [u8]
    }
}

/// Encode `input` into one or more canvases.
pub fn encode(input: Input<'_>, metadata: &Metadata, options: &EncodeOptions) -> Result<Vec<RawImageData>, PxfError> {
    encode_with_progress(input, metadata, options, None)
}

pub fn encode_with_progress(
    input: Input<'_>, metadata: &Metadata, options: &EncodeOptions, mut progress: Option<&mut ProgressFn<'_>>
) -> Result<Vec<RawImageData>, PxfError> {
    report(progress.as_deref_mut(), 0)?;

    let canvases = match input {
        Input::Binary { data } => PxfEncoder::encode(data, metadata, options)?,
        Input::Audio {
            channels,
            sample_rate,
            bits_per_sample
        } => AudioEncoder::encode(channels, sample_rate, metadata, options, bits_per_sample)?
    };

    report(progress.as_deref_mut(), 100)?;
    Ok(canvases)
}

/// The result of [`decode`]: recovered payload bytes and whether the
/// embedded CRC-32 matched.
pub struct BinaryResult {
    pub data: Vec<u8>,
    pub valid_checksum: bool
}

/// Per-row and aggregate erasure statistics, reported as a fraction in
/// `[0, 1]` rather than a percentage, for consistency with
/// [`crate::cell::RowHealth::health`].
pub type DebugInfo = DecodeHealth;

/// Decode a binary frame spread across `sources`. When `debug` is given,
/// it is filled with per-row and overall health.
pub fn decode(sources: &[RawImageData], debug: Option<&mut DebugInfo>) -> Result<BinaryResult, PxfError> {
    let decoded = PxfDecoder::decode(sources)?;

    if let Some(slot) = debug {
        *slot = decoded.health.clone();
    }

    Ok(BinaryResult {
        data: decoded.payload,
        valid_checksum: decoded.valid_checksum
    })
}

/// `{version, M, flags}`, surfaced for UIs that want to show how a canvas
/// was encoded without decoding its payload.
#[derive(Copy, Clone, Debug)]
pub struct VisualizationMetadata {
    pub version: u16,
    pub m: u8,
    pub flags_raw: u16
}

fn visualization_metadata(header: &crate::frame::CanvasHeader) -> VisualizationMetadata {
    VisualizationMetadata {
        version: crate::frame::VERSION,
        m: header.m,
        flags_raw: header.flags.to_u16()
    }
}

/// Header and metadata recovered from image 0, without reading a payload.
/// `load` performs only cell-to-bit recovery and header parsing — callers
/// after inspecting `metadata`/`visualization_metadata` still need the full
/// canvas set to decode a payload, via [`decode`] or [`decode_metadata_only`].
pub struct PreparedSource {
    pub metadata: Metadata,
    pub visualization_metadata: VisualizationMetadata
}

pub fn load(canvas: &RawImageData) -> Result<PreparedSource, PxfError> {
    let (header, metadata) = binary::peek_metadata(canvas)?;
    Ok(PreparedSource {
        metadata,
        visualization_metadata: visualization_metadata(&header)
    })
}

/// The tagged result of [`decode_metadata_only`]: either variant carries
/// `metadata`/`visualization_metadata`; only `Audio` additionally carries a
/// ready-to-use streaming decoder.
pub enum MetadataProbe {
    Audio {
        metadata: Metadata,
        visualization_metadata: VisualizationMetadata,
        sample_rate: u32,
        decoder: StreamingAudioDecoder
    },
    Binary {
        metadata: Metadata,
        visualization_metadata: VisualizationMetadata
    }
}

/// Inspect a canvas set's type and metadata. For audio, this materializes a
/// full [`StreamingAudioDecoder`] (audio headers describe sample geometry
/// the caller will need momentarily anyway); for binary, the payload itself
/// is left undecoded.
pub fn decode_metadata_only(sources: &[RawImageData]) -> Result<MetadataProbe, PxfError> {
    if sources.is_empty() {
        return Err(PxfError::BadImageSet("no canvases given".to_string()));
    }

    let (header, _) = binary::peek_metadata(&sources[0])?;
    let viz = visualization_metadata(&header);

    if header.flags.audio {
        let decoder = StreamingAudioDecoder::open(sources)?;
        let sample_rate = decoder.sample_rate();
        let metadata = decoder.metadata().clone();
        Ok(MetadataProbe::Audio {
            metadata,
            visualization_metadata: viz,
            sample_rate,
            decoder
        })
    } else {
        let (_, metadata) = binary::peek_metadata(&sources[0])?;
        Ok(MetadataProbe::Binary {
            metadata,
            visualization_metadata: viz
        })
    }
}

/// The general-purpose tagged decode result: callers that don't already
/// know whether a canvas set is audio or binary switch on this tag instead
/// of calling [`decode`] and guessing.
pub enum DecodeResult {
    Audio {
        sample_rate: u32,
        decoder: StreamingAudioDecoder
    },
    Binary {
        data: Vec<u8>,
        valid_checksum: bool
    }
}

pub fn decode_any(sources: &[RawImageData]) -> Result<DecodeResult, PxfError> {
    if sources.is_empty() {
        return Err(PxfError::BadImageSet("no canvases given".to_string()));
    }

    let (header, _) = binary::peek_metadata(&sources[0])?;

    if header.flags.audio {
        let decoder = StreamingAudioDecoder::open(sources)?;
        Ok(DecodeResult::Audio {
            sample_rate: decoder.sample_rate(),
            decoder
        })
    } else {
        let decoded = PxfDecoder::decode(sources)?;
        Ok(DecodeResult::Binary {
            data: decoded.payload,
            valid_checksum: decoded.valid_checksum
        })
    }
}
