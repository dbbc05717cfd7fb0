//! The on-wire frame layout: per-canvas header, metadata block (image 0
//! only), and the payload-length/payload/CRC/end-marker trailer that spans
//! canvases when the payload doesn't fit in one.
//!
//! Every canvas carries its own small header so the decoder can identify
//! and order canvases before it has assembled enough of the bit stream to
//! parse anything else; only image 0 additionally carries the metadata
//! block, after which the payload-length/payload/CRC/end-marker trailer
//! begins and continues seamlessly into the next canvas's bit capacity.

use pxf_core::bytestream::{ZByteReader, ZByteWriter};
use pxf_core::crc32;

use crate::errors::PxfError;

pub const MAGIC: [u8; 4] = *b"PXF3";
pub const VERSION: u16 = 300;
/// Written as the two literal bytes 0xA5, 0x5A (not as a little-endian u16).
pub const END_MARKER: [u8; 2] = [0xA5, 0x5A];

/// `magic(32) + version(16) + flags(16) + m(8) + image_index(8) + image_count(8)`.
pub const CANVAS_HEADER_BITS: u64 = 88;
pub const CANVAS_HEADER_BYTES: usize = 11;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Flags {
    pub compact: bool,
    pub audio: bool,
    pub multi_image: bool,
    pub checksum: bool,
    pub redundancy: u8
}

impl Flags {
    pub fn to_u16(self) -> u16 {
        let mut bits = 0u16;
        if self.compact {
            bits |= 1 << 0;
        }
        if self.audio {
            bits |= 1 << 1;
        }
        if self.multi_image {
            bits |= 1 << 2;
        }
        if self.checksum {
            bits |= 1 << 3;
        }
        bits |= u16::from(self.redundancy) << 8;
        bits
    }

    pub fn from_u16(bits: u16) -> Flags {
        Flags {
            compact: bits & 1 != 0,
            audio: bits & 2 != 0,
            multi_image: bits & 4 != 0,
            checksum: bits & 8 != 0,
            redundancy: (bits >> 8) as u8
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct CanvasHeader {
    pub flags: Flags,
    pub m: u8,
    pub image_index: u8,
    pub image_count: u8
}

impl CanvasHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ZByteWriter::with_capacity(CANVAS_HEADER_BYTES);
        w.write_bytes(&MAGIC);
        w.write_u16_le(VERSION);
        w.write_u16_le(self.flags.to_u16());
        w.write_u8(self.m);
        w.write_u8(self.image_index);
        w.write_u8(self.image_count);
        w.into_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<CanvasHeader, PxfError> {
        let mut r = ZByteReader::new(bytes);
        let magic = r.get_as_ref(4).map_err(|_| PxfError::Truncated)?;

        if magic != MAGIC {
            return Err(PxfError::InvalidMagic);
        }

        let version = r.get_u16_le_err().map_err(|_| PxfError::Truncated)?;
        if version != VERSION {
            return Err(PxfError::UnsupportedVersion(version));
        }

        let flags = Flags::from_u16(r.get_u16_le_err().map_err(|_| PxfError::Truncated)?);
        let m = r.get_u8_err().map_err(|_| PxfError::Truncated)?;
        let image_index = r.get_u8_err().map_err(|_| PxfError::Truncated)?;
        let image_count = r.get_u8_err().map_err(|_| PxfError::Truncated)?;

        Ok(CanvasHeader {
            flags,
            m,
            image_index,
            image_count
        })
    }
}

/// Build the `payload_length || payload || crc32 || end_marker` trailer.
/// The CRC covers the length field and the payload, in that order.
pub fn build_trailer(payload: &[u8]) -> Result<Vec<u8>, PxfError> {
    if payload.len() as u64 > u64::from(u32::MAX) {
        return Err(PxfError::PayloadTooLarge(payload.len() as u64));
    }

    let mut w = ZByteWriter::with_capacity(4 + payload.len() + 4 + 2);
    w.write_u32_le(payload.len() as u32);
    w.write_bytes(payload);

    let checksum = crc32::crc32(w.as_slice());
    w.write_u32_le(checksum);
    w.write_bytes(&END_MARKER);

    Ok(w.into_vec())
}

/// The parsed trailer: payload bytes and whether the embedded CRC matched.
pub struct ParsedTrailer {
    pub payload: Vec<u8>,
    pub valid_checksum: bool
}

pub fn parse_trailer(bytes: &[u8]) -> Result<ParsedTrailer, PxfError> {
    let mut r = ZByteReader::new(bytes);
    let payload_len = r.get_u32_le_err().map_err(|_| PxfError::Truncated)?;
    let payload = r.get_as_ref(payload_len as usize).map_err(|_| PxfError::Truncated)?.to_vec();

    let covered_len = 4 + payload.len();
    let expected_checksum = crc32::crc32(&bytes[..covered_len]);

    let stored_checksum = r.get_u32_le_err().map_err(|_| PxfError::Truncated)?;
    let end_marker = r.get_as_ref(2).map_err(|_| PxfError::Truncated)?;

    if end_marker != END_MARKER {
        return Err(PxfError::BadMetadata("frame trailer is missing its end marker".to_string()));
    }

    Ok(ParsedTrailer {
        payload,
        valid_checksum: stored_checksum == expected_checksum
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_header_round_trips() {
        let header = CanvasHeader {
            flags: Flags {
                compact: true,
                audio: false,
                multi_image: true,
                checksum: true,
                redundancy: 3
            },
            m: 8,
            image_index: 1,
            image_count: 2
        };

        let bytes = header.encode();
        assert_eq!(bytes.len(), CANVAS_HEADER_BYTES);

        let decoded = CanvasHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.flags, header.flags);
        assert_eq!(decoded.m, header.m);
        assert_eq!(decoded.image_index, header.image_index);
        assert_eq!(decoded.image_count, header.image_count);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = CanvasHeader {
            flags: Flags {
                compact: true,
                audio: false,
                multi_image: false,
                checksum: true,
                redundancy: 1
            },
            m: 4,
            image_index: 0,
            image_count: 1
        }
        .encode();
        bytes[0] = b'X';

        assert!(matches!(CanvasHeader::decode(&bytes), Err(PxfError::InvalidMagic)));
    }

    #[test]
    fn trailer_round_trips_and_validates_checksum() {
        let payload = b"hello".to_vec();
        let trailer = build_trailer(&payload).unwrap();
        let parsed = parse_trailer(&trailer).unwrap();

        assert_eq!(parsed.payload, payload);
        assert!(parsed.valid_checksum);
    }

    #[test]
    fn corrupted_payload_fails_checksum_but_still_returns_bytes() {
        let payload = b"hello".to_vec();
        let mut trailer = build_trailer(&payload).unwrap();
        trailer[4] ^= 0xFF; // corrupt the first payload byte

        let parsed = parse_trailer(&trailer).unwrap();
        assert_eq!(parsed.payload.len(), payload.len());
        assert!(!parsed.valid_checksum);
    }

    #[test]
    fn empty_payload_is_legal() {
        let trailer = build_trailer(&[]).unwrap();
        let parsed = parse_trailer(&trailer).unwrap();
        assert!(parsed.payload.is_empty());
        assert!(parsed.valid_checksum);
    }
}
