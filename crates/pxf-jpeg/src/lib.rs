//! A baseline (SOF0) JPEG decoder.
//!
//! `pxf` hands a canvas to an external transport with no control over
//! whether that transport re-saves it as JPEG along the way. This crate is
//! the read side of that journey: it decodes whatever baseline JPEG comes
//! back into the same raw RGBA canvas shape `pxf` started with, using
//! nearest-neighbor chroma upsampling instead of the fancier interpolation
//! a general-purpose image decoder would use, because interpolation would
//! blur the hard cell edges PXF's macroblock layout depends on.
//!
//! Progressive (SOF2), arithmetic-coded, and non-8-bit-precision JPEGs are
//! out of scope and reported as [`errors::DecodeErrors::UnsupportedJpeg`]
//! rather than guessed at.

mod annex_k;
mod bitstream;
mod color_convert;
mod components;
pub mod decoder;
pub mod errors;
mod headers;
mod idct;
mod marker;
mod misc;
mod upsampler;

pub use decoder::{decode_jpeg, is_jpeg, DecodedImage, JpegDecoder};
pub use errors::DecodeErrors;
