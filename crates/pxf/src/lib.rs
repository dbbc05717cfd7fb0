//! PXF: a container that smuggles binary payloads and PCM audio through
//! lossy image-hosting intermediaries by encoding them as the pixels of one
//! or more raster images.
//!
//! The crate is organized bottom-up, the way the format itself is layered:
//!
//! - [`cell`] — the bit/pixel mapping for a single macroblock
//! - [`frame`] — header, metadata block, and trailer serialization
//! - [`metadata`] — the key/value dictionary carried in every frame
//! - [`canvas`] — the raw RGBA8 pixel buffer the rest of the crate reads
//!   and writes
//! - [`binary`] — the binary payload encoder/decoder
//! - [`audio`] / [`streaming`] — the audio encoder and chunked decoder
//! - [`facade`] — `encode`/`load`/`decode_metadata_only`/`decode`, the
//!   entry points most callers actually use
//!
//! JPEG recovery (for canvases that went through a lossy re-encode) lives
//! in the sibling `pxf-jpeg` crate and is re-exported here.

pub mod audio;
pub mod binary;
pub mod canvas;
pub mod cell;
pub mod errors;
pub mod facade;
pub mod frame;
pub mod metadata;
pub mod options;
pub mod streaming;

pub use audio::{decode_audio, AudioEncoder, DecodedAudio};
pub use canvas::RawImageData;
pub use errors::PxfError;
pub use facade::{
    decode, decode_any, decode_metadata_only, encode, encode_with_progress, load, BinaryResult, DebugInfo, DecodeResult, Input,
    MetadataProbe, PreparedSource, VisualizationMetadata
};
pub use metadata::Metadata;
pub use options::{ColorMode, EncodeOptions};
pub use streaming::StreamingAudioDecoder;

pub use pxf_jpeg::{decode_jpeg, is_jpeg, DecodedImage};
