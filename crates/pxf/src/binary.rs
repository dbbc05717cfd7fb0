//! Encoding and decoding of arbitrary binary payloads as one or more
//! canvases: turns a byte payload into a bit stream laid out per
//! [`crate::frame`] and packed into cells, and the reverse.

use crate::canvas::RawImageData;
use crate::cell::{CellReader, CellWriter, Mode};
use crate::errors::PxfError;
use crate::frame::{self, CanvasHeader, Flags, CANVAS_HEADER_BITS};
use crate::metadata::Metadata;
use crate::options::EncodeOptions;

/// Per-row and overall erasure statistics, gathered while decoding. Exposed
/// to callers mainly for diagnostics; it plays no part in the checksum
/// verdict.
#[derive(Clone, Debug)]
pub struct DecodeHealth {
    pub row_health: Vec<f64>,
    pub overall_health: f64
}

pub struct DecodedBinary {
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    pub valid_checksum: bool,
    pub health: DecodeHealth
}

pub(crate) fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

pub(crate) fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let mut byte = 0u8;
            for (i, &bit) in chunk.iter().enumerate() {
                byte |= (bit & 1) << (7 - i);
            }
            byte
        })
        .collect()
}

/// How many logical bits a canvas of `cells` total cells can hold, given
/// the channel mode and redundancy.
pub(crate) fn canvas_capacity_bits(cells: u64, bits_per_cell: u64, redundancy: u64) -> u64 {
    (cells / redundancy.max(1)) * bits_per_cell
}

/// Pick the side length, in cells, of a square canvas that holds at least
/// `bits` logical bits.
fn side_for_bits(bits: u64, bits_per_cell: u64, redundancy: u64) -> u64 {
    let slots_needed = bits.div_ceil(bits_per_cell.max(1));
    let cells_needed = slots_needed * redundancy.max(1);
    (cells_needed as f64).sqrt().ceil() as u64
}

pub(crate) struct Layout {
    pub(crate) mode: Mode,
    pub(crate) redundancy: u8,
    pub(crate) m: u32,
    pub(crate) canvas_side_cells: u64,
    pub(crate) canvas_count: u32
}

/// Work out the channel mode, macroblock size, and canvas count for a
/// canvas whose image-0 copy carries `metadata_bytes` bytes of metadata,
/// `extra_fixed_bytes` bytes of format-specific header (e.g. the audio
/// header), and `blob_bytes` bytes of trailer (payload length + payload +
/// CRC + end marker), following a "choose the smallest M that fits, else
/// split across canvases" rule.
///
/// Every extra canvas needs its own [`CANVAS_HEADER_BITS`]-bit header; this
/// is accounted for with a single corrective pass rather than an iterative
/// fixed point, since the header overhead is minute next to any payload
/// that actually needs to split.
pub(crate) fn plan_layout(options: &EncodeOptions, metadata_bytes: usize, extra_fixed_bytes: usize, blob_bytes: usize) -> Layout {
    let fixed_bits = CANVAS_HEADER_BITS + 16 + (metadata_bytes as u64) * 8 + (extra_fixed_bytes as u64) * 8;
    let blob_bits = (blob_bytes as u64) * 8;
    let redundancy = options.redundancy.max(1);

    let mode = options.resolve_mode(fixed_bits + blob_bits);
    let bits_per_cell = u64::from(mode.bits_per_cell());

    let single_side = side_for_bits(fixed_bits + blob_bits, bits_per_cell, u64::from(redundancy));

    if single_side * 2 <= u64::from(options.max_dim) {
        return Layout {
            mode,
            redundancy,
            m: 2,
            canvas_side_cells: single_side,
            canvas_count: 1
        };
    }

    // Doesn't fit in one canvas at the minimum macroblock size: split.
    let max_side_cells = u64::from(options.max_dim) / 2;
    let max_cells_per_canvas = max_side_cells * max_side_cells;
    let max_capacity_per_canvas = canvas_capacity_bits(max_cells_per_canvas, bits_per_cell, u64::from(redundancy));

    let initial_count = (fixed_bits + blob_bits).div_ceil(max_capacity_per_canvas.max(1));
    let header_overhead_bits = CANVAS_HEADER_BITS * (initial_count.saturating_sub(1));
    let canvas_count = (fixed_bits + blob_bits + header_overhead_bits).div_ceil(max_capacity_per_canvas.max(1)).max(1);

    Layout {
        mode,
        redundancy,
        m: 2,
        canvas_side_cells: max_side_cells,
        canvas_count: canvas_count as u32
    }
}

pub struct PxfEncoder;

impl PxfEncoder {
    /// Encode a binary payload and its metadata into one or more canvases.
    pub fn encode(payload: &[u8], metadata: &Metadata, options: &EncodeOptions) -> Result<Vec<RawImageData>, PxfError> {
        let metadata_bytes = metadata.encode()?;
        let trailer = frame::build_trailer(payload)?;

        let layout = plan_layout(options, metadata_bytes.len(), 0, trailer.len());

        let mut bits = bytes_to_bits(&metadata_bytes);
        // metadata length field, big enough for the 2048-byte cap.
        let mut length_prefixed = bytes_to_bits(&(metadata_bytes.len() as u16).to_le_bytes());
        length_prefixed.append(&mut bits);
        let mut body_bits = length_prefixed;
        body_bits.extend(bytes_to_bits(&trailer));

        let canvas_dim = (layout.canvas_side_cells * u64::from(layout.m)) as u32;
        let mut canvases = Vec::with_capacity(layout.canvas_count as usize);
        let mut cursor = 0usize;

        for index in 0..layout.canvas_count {
            let header = CanvasHeader {
                flags: Flags {
                    compact: layout.mode == Mode::Compact,
                    audio: false,
                    multi_image: layout.canvas_count > 1,
                    checksum: true,
                    redundancy: layout.redundancy
                },
                m: layout.m as u8,
                image_index: index as u8,
                image_count: layout.canvas_count as u8
            };

            let mut canvas = RawImageData::new(canvas_dim, canvas_dim);
            let mut writer = CellWriter::new(&mut canvas, layout.m, layout.mode, layout.redundancy);
            writer.write_bits(&bytes_to_bits(&header.encode()));

            let capacity_bits = canvas_capacity_bits(
                canvas.total_cells(layout.m),
                u64::from(layout.mode.bits_per_cell()),
                u64::from(layout.redundancy)
            );
            let usable = capacity_bits.saturating_sub(CANVAS_HEADER_BITS) as usize;
            let take = usable.min(body_bits.len() - cursor);
            writer.write_bits(&body_bits[cursor..cursor + take]);
            cursor += take;

            writer.finish();
            writer.fill_remaining();
            canvases.push(canvas);
        }

        if cursor < body_bits.len() {
            return Err(PxfError::InvalidInput(
                "payload did not fit in the planned canvas set; this is an encoder bug".to_string()
            ));
        }

        Ok(canvases)
    }
}

pub struct PxfDecoder;

impl PxfDecoder {
    /// Decode a binary frame spread across `canvases`, given in image-index
    /// order (image 0 first).
    pub fn decode(canvases: &[RawImageData]) -> Result<DecodedBinary, PxfError> {
        if canvases.is_empty() {
            return Err(PxfError::BadImageSet("no canvases given".to_string()));
        }

        // Peek image 0's header using a nominal M; headers are written
        // before any M-dependent packing decision affects their own bytes,
        // so any M large enough to contain 11 bytes at 1 bit/cell works for
        // the peek. We instead trust the canvas's own geometry: scan a
        // small set of plausible M values used by this encoder (multiples
        // of 2 up to 64) and pick the one whose header parses cleanly.
        let (header0, m, mode, redundancy) = probe_header(&canvases[0])?;

        if usize::from(header0.image_count) != canvases.len() {
            return Err(PxfError::BadImageSet(format!(
                "frame header declares {} images but {} canvases were given",
                header0.image_count,
                canvases.len()
            )));
        }

        let mut row_health = Vec::new();
        let mut all_bits = Vec::new();

        for (index, canvas) in canvases.iter().enumerate() {
            let mut reader = CellReader::new(canvas, m, mode, redundancy);
            let header_bits = reader.read_bits(CANVAS_HEADER_BITS);
            let header_bytes = bits_to_bytes(&header_bits);
            let header = CanvasHeader::decode(&header_bytes)?;

            if usize::from(header.image_index) != index {
                return Err(PxfError::BadImageSet(format!(
                    "canvas at position {index} carries image index {}",
                    header.image_index
                )));
            }

            let capacity_bits =
                canvas_capacity_bits(canvas.total_cells(m), u64::from(mode.bits_per_cell()), u64::from(redundancy));
            let remaining = capacity_bits.saturating_sub(CANVAS_HEADER_BITS);
            all_bits.extend(reader.read_bits(remaining));

            for row in &reader.row_health {
                row_health.push(row.health());
            }
        }

        if all_bits.len() < 16 {
            return Err(PxfError::Truncated);
        }

        let metadata_len = u16::from_le_bytes([bits_to_bytes(&all_bits[0..8])[0], bits_to_bytes(&all_bits[8..16])[0]]);
        let metadata_start = 16;
        let metadata_end = metadata_start + usize::from(metadata_len) * 8;

        if all_bits.len() < metadata_end {
            return Err(PxfError::Truncated);
        }

        let metadata_bytes = bits_to_bytes(&all_bits[metadata_start..metadata_end]);
        let (metadata, consumed) = Metadata::decode(&metadata_bytes)?;
        if consumed != metadata_bytes.len() {
            return Err(PxfError::BadMetadata("trailing bytes after metadata block".to_string()));
        }

        let trailer_bits = &all_bits[metadata_end..];
        let trailer_bytes = bits_to_bytes(trailer_bits);
        let parsed = frame::parse_trailer(&trailer_bytes)?;

        let overall_health = if row_health.is_empty() {
            1.0
        } else {
            row_health.iter().sum::<f64>() / row_health.len() as f64
        };

        Ok(DecodedBinary {
            payload: parsed.payload,
            metadata,
            valid_checksum: parsed.valid_checksum,
            health: DecodeHealth {
                row_health,
                overall_health
            }
        })
    }
}

/// Metadata length and payload length are read directly from `all_bits`
/// after the header, little-endian, one byte at a time.
pub(crate) fn probe_header(canvas: &RawImageData) -> Result<(CanvasHeader, u32, Mode, u8), PxfError> {
    for m in 1u32..=32 {
        if canvas.width % m != 0 || canvas.height % m != 0 || canvas.total_cells(m) == 0 {
            continue;
        }

        for &mode in &[Mode::Compact, Mode::Expanded] {
            for &redundancy in &[1u8, 3, 5] {
                let mut reader = CellReader::new(canvas, m, mode, redundancy);
                let header_bits = reader.read_bits(CANVAS_HEADER_BITS);
                let header_bytes = bits_to_bytes(&header_bits);

                if let Ok(header) = CanvasHeader::decode(&header_bytes) {
                    let declared_mode = if header.flags.compact { Mode::Compact } else { Mode::Expanded };
                    if declared_mode == mode && header.flags.redundancy == redundancy && u32::from(header.m) == m {
                        return Ok((header, m, mode, redundancy));
                    }
                }
            }
        }
    }

    Err(PxfError::InvalidMagic)
}

/// Read just the header and metadata block of image 0, without touching
/// the payload. Backs [`crate::facade::decode_metadata_only`].
pub fn peek_metadata(canvas: &RawImageData) -> Result<(CanvasHeader, Metadata), PxfError> {
    let (header, m, mode, redundancy) = probe_header(canvas)?;

    let mut reader = CellReader::new(canvas, m, mode, redundancy);
    reader.read_bits(CANVAS_HEADER_BITS);

    let metadata_len_bits = reader.read_bits(16);
    let metadata_len =
        u16::from_le_bytes([bits_to_bytes(&metadata_len_bits[0..8])[0], bits_to_bytes(&metadata_len_bits[8..16])[0]]);

    let metadata_bytes = bits_to_bytes(&reader.read_bits(u64::from(metadata_len) * 8));
    let (metadata, consumed) = Metadata::decode(&metadata_bytes)?;
    if consumed != metadata_bytes.len() {
        return Err(PxfError::BadMetadata("trailing bytes after metadata block".to_string()));
    }

    Ok((header, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_round_trips_through_a_single_canvas() {
        let payload = b"the quick brown fox".to_vec();
        let mut metadata = Metadata::new();
        metadata.insert("filename", "fox.txt").unwrap();

        let options = EncodeOptions::default();
        let canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();
        assert_eq!(canvases.len(), 1);

        let decoded = PxfDecoder::decode(&canvases).unwrap();
        assert_eq!(decoded.payload, payload);
        assert!(decoded.valid_checksum);
        assert_eq!(decoded.metadata.get("filename"), Some("fox.txt"));
        assert!(decoded.health.overall_health > 0.99);
    }

    #[test]
    fn empty_payload_round_trips() {
        let payload = Vec::new();
        let metadata = Metadata::new();
        let options = EncodeOptions::default();

        let canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();
        let decoded = PxfDecoder::decode(&canvases).unwrap();

        assert!(decoded.payload.is_empty());
        assert!(decoded.valid_checksum);
    }

    #[test]
    fn redundancy_three_survives_tampering_with_a_minority_of_cells() {
        let payload = b"tolerant".to_vec();
        let metadata = Metadata::new();
        let mut options = EncodeOptions::default();
        options.redundancy = 3;

        let mut canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();

        // Corrupt a single whole cell (one of three redundant copies of
        // whichever slot it belongs to) well inside the data region, by
        // overwriting its entire M x M pixel block with the opposite
        // threshold color. Majority vote over the other two untouched
        // copies still recovers the original bit.
        let canvas = &mut canvases[0];
        let m = 2u32;
        let cells_per_row = canvas.cells_per_row(m);
        let target_cell = 200u32.min(canvas.total_cells(m) as u32 - 1);
        let row = target_cell / cells_per_row;
        let col = target_cell % cells_per_row;
        crate::cell::write_cell(canvas, row, col, m, (crate::cell::OFF, crate::cell::OFF, crate::cell::OFF));

        let decoded = PxfDecoder::decode(&canvases).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn explicit_compact_mode_is_honored() {
        let payload = b"xyz".to_vec();
        let metadata = Metadata::new();
        let mut options = EncodeOptions::default();
        options.mode = crate::options::ColorMode::Compact;

        let canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();
        let decoded = PxfDecoder::decode(&canvases).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn forced_expanded_mode_fits_more_bits_per_cell() {
        let payload = vec![0xABu8; 200];
        let metadata = Metadata::new();
        let mut options = EncodeOptions::default();
        options.mode = crate::options::ColorMode::Expanded;

        let canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();
        let decoded = PxfDecoder::decode(&canvases).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn peek_metadata_does_not_require_the_rest_of_the_canvas_set() {
        let payload = b"only image 0 is needed for this".to_vec();
        let mut metadata = Metadata::new();
        metadata.insert("filename", "peek.bin").unwrap();

        let options = EncodeOptions::default();
        let canvases = PxfEncoder::encode(&payload, &metadata, &options).unwrap();

        let (header, peeked) = peek_metadata(&canvases[0]).unwrap();
        assert_eq!(peeked.get("filename"), Some("peek.bin"));
        assert!(!header.flags.audio);
    }
}
