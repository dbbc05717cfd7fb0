//! Small constants and helpers shared across the decoder.

/// Maps a zigzag-ordered DCT coefficient index to its natural
/// (row-major) position inside an 8x8 block. Standard JPEG constant,
/// identical in every baseline decoder.
#[rustfmt::skip]
pub const UN_ZIGZAG: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Which frame type a SOF marker declared. Only `Baseline` decodes; the
/// other variants exist so the decoder can name what it refused to do.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameKind {
    Baseline,
    ExtendedSequential,
    Progressive
}

impl FrameKind {
    pub fn from_marker(marker: u8) -> Option<FrameKind> {
        match marker {
            crate::marker::SOF0 => Some(FrameKind::Baseline),
            crate::marker::SOF1 => Some(FrameKind::ExtendedSequential),
            crate::marker::SOF2 => Some(FrameKind::Progressive),
            _ => None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FrameKind::Baseline => "baseline (SOF0)",
            FrameKind::ExtendedSequential => "extended sequential (SOF1)",
            FrameKind::Progressive => "progressive (SOF2)"
        }
    }
}
