//! JPEG marker codes relevant to a baseline-only decoder.

#![allow(dead_code)]

/// Start of image.
pub const SOI: u8 = 0xD8;
/// End of image.
pub const EOI: u8 = 0xD9;
/// Baseline DCT (the only frame type this crate decodes).
pub const SOF0: u8 = 0xC0;
/// Extended sequential DCT. Rejected as unsupported, same as progressive.
pub const SOF1: u8 = 0xC1;
/// Progressive DCT. Rejected: PXF's own encoder never produces one, and
/// decoding one correctly needs the multi-scan coefficient-accumulation
/// machinery this crate deliberately doesn't carry.
pub const SOF2: u8 = 0xC2;
/// Define Huffman table(s).
pub const DHT: u8 = 0xC4;
/// Define quantization table(s).
pub const DQT: u8 = 0xDB;
/// Define restart interval.
pub const DRI: u8 = 0xDD;
/// Start of scan.
pub const SOS: u8 = 0xDA;
/// Restart markers 0-7.
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;
/// Application segments, APPn.
pub const APP0: u8 = 0xE0;
pub const APP15: u8 = 0xEF;
/// Comment segment.
pub const COM: u8 = 0xFE;
/// Define arithmetic conditioning. Implies arithmetic coding, unsupported.
pub const DAC: u8 = 0xCC;
/// Define number of lines, an obscure extension almost nothing emits.
pub const DNL: u8 = 0xDC;
/// Temporary private marker, must be ignored if present.
pub const TEM: u8 = 0x01;

/// True if `byte` is one of the eight restart markers (0xD0-0xD7).
pub const fn is_restart(byte: u8) -> bool {
    byte >= RST0 && byte <= RST7
}

/// True if `byte` is one of the SOFn markers this decoder understands enough
/// to at least classify (baseline, extended sequential, or progressive).
/// Other SOFn codes (lossless, hierarchical, arithmetic variants) are never
/// produced by PXF's own encoder and are reported as unsupported.
pub const fn is_start_of_frame(byte: u8) -> bool {
    matches!(byte, SOF0 | SOF1 | SOF2)
}
