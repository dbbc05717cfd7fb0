//! Errors produced by the codec.
//!
//! `ChecksumMismatch` is deliberately not a variant here: a CRC mismatch is
//! surfaced as a `valid_checksum: bool` field on the decode result instead,
//! per the propagation policy the rest of this workspace follows (see
//! `pxf_jpeg::errors::DecodeErrors` for the same shape of decision).

use std::fmt;
use std::fmt::{Debug, Formatter};

#[non_exhaustive]
pub enum PxfError {
    /// Malformed caller input: empty payload where one is required, neither
    /// or both of `audio`/`binary` set, metadata that fails validation.
    InvalidInput(String),
    /// The frame does not begin with the "PXF3" sentinel.
    InvalidMagic,
    /// The frame's version field is not 300.
    UnsupportedVersion(u16),
    /// The bit stream ended before a complete frame could be read.
    Truncated,
    /// A metadata record is structurally invalid: a duplicate or empty key,
    /// a key/value that isn't valid UTF-8, or a block exceeding 2048 bytes.
    BadMetadata(String),
    /// Metadata exceeded the 2048-byte budget during encoding.
    MetadataTooLarge(usize),
    /// Payload exceeded the `u32` length field during encoding.
    PayloadTooLarge(u64),
    /// A metadata key was empty, duplicated, or the reserved key `fn`.
    InvalidKey(String),
    /// The canvas set given to the decoder does not have the image indices
    /// `0..count` with no gaps.
    BadImageSet(String),
    /// Propagated from the JPEG front end when a canvas had to be
    /// reconstructed from a re-encoded JPEG first.
    Jpeg(pxf_jpeg::DecodeErrors),
    /// A progress callback returned an error; the operation aborted and the
    /// producing value is no longer usable.
    Cancelled
}

impl Debug for PxfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::InvalidMagic => write!(f, "Frame does not start with the PXF3 magic sentinel"),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported frame version {v}, expected 300"),
            Self::Truncated => write!(f, "Frame ended before it could be fully parsed"),
            Self::BadMetadata(msg) => write!(f, "Bad metadata: {msg}"),
            Self::MetadataTooLarge(size) => write!(f, "Metadata block is {size} bytes, over the 2048-byte limit"),
            Self::PayloadTooLarge(size) => write!(f, "Payload is {size} bytes, over the u32 length field's range"),
            Self::InvalidKey(key) => write!(f, "Invalid metadata key: {key}"),
            Self::BadImageSet(msg) => write!(f, "Bad image set: {msg}"),
            Self::Jpeg(err) => write!(f, "JPEG front end: {err:?}"),
            Self::Cancelled => write!(f, "Operation was cancelled by a progress callback")
        }
    }
}

impl fmt::Display for PxfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::error::Error for PxfError {}

impl From<pxf_jpeg::DecodeErrors> for PxfError {
    fn from(value: pxf_jpeg::DecodeErrors) -> Self {
        PxfError::Jpeg(value)
    }
}
