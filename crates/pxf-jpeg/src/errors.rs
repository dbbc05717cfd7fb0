//! Errors produced by the JPEG front end.

use std::fmt;
use std::fmt::{Debug, Formatter};

/// Errors that can occur while parsing or decoding a baseline JPEG stream.
///
/// Per the propagation policy the rest of the workspace follows, this never
/// indicates "the checksum didn't match" (there is no checksum here) — it is
/// strictly for malformed or unsupported input.
#[non_exhaustive]
pub enum DecodeErrors {
    /// The stream does not start with the SOI marker (0xFFD8).
    InvalidMagicBytes,
    /// A SOF marker other than SOF0 (baseline) was seen: progressive (SOF2),
    /// lossless, or arithmetic-coded images are out of scope.
    UnsupportedJpeg(&'static str),
    /// The entropy-coded segment, a header, or the overall stream ended
    /// before decoding could complete.
    Truncated,
    /// The stream is structurally wrong in a way that isn't simply running
    /// out of bytes: a bad marker length, an out-of-range table index, a
    /// corrupt restart cycle from which the next MCU did not recover, etc.
    CorruptJpeg(String),
    /// A static-str variant of [`CorruptJpeg`](Self::CorruptJpeg) for
    /// messages that don't need to be built at runtime.
    CorruptJpegStatic(&'static str)
}

impl Debug for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagicBytes => {
                write!(f, "Invalid magic bytes: stream does not start with SOI (0xFFD8)")
            }
            Self::UnsupportedJpeg(reason) => write!(f, "Unsupported JPEG: {reason}"),
            Self::Truncated => write!(f, "Truncated JPEG stream"),
            Self::CorruptJpeg(msg) => write!(f, "Corrupt JPEG: {msg}"),
            Self::CorruptJpegStatic(msg) => write!(f, "Corrupt JPEG: {msg}")
        }
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::error::Error for DecodeErrors {}

impl From<&'static str> for DecodeErrors {
    fn from(_value: &'static str) -> Self {
        DecodeErrors::Truncated
    }
}
