//! Exercises the round-trip, boundary, and tolerance properties of the
//! binary codec end to end, through the public facade rather than the
//! internal `binary`/`frame` modules directly.

use pxf::{decode, decode_metadata_only, encode, load, ColorMode, EncodeOptions, Input, Metadata, MetadataProbe};

/// A small deterministic generator, standing in for `random(100 KiB)`
/// without pulling in a `rand` dependency for one test.
fn lcg_bytes(n: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

#[test]
fn large_random_payload_round_trips() {
    let payload = lcg_bytes(100 * 1024, 0xC0FFEE);
    let mut metadata = Metadata::new();
    metadata.insert("filename", "blob.bin").unwrap();
    let options = EncodeOptions::default();

    let canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();
    let result = decode(&canvases, None).unwrap();

    assert_eq!(result.data, payload);
    assert!(result.valid_checksum);
}

#[test]
fn metadata_round_trips_through_decode_metadata_only() {
    let payload = b"arbitrary payload".to_vec();
    let mut metadata = Metadata::new();
    metadata.insert("filename", "hi.txt").unwrap();
    metadata.insert("comment", "hello world").unwrap();
    let options = EncodeOptions::default();

    let canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();

    match decode_metadata_only(&canvases).unwrap() {
        MetadataProbe::Binary { metadata: recovered, .. } => {
            assert_eq!(recovered.len(), metadata.len());
            for (k, v) in metadata.iter() {
                assert_eq!(recovered.get(k), Some(v));
            }
        }
        MetadataProbe::Audio { .. } => panic!("expected a binary probe"),
    }
}

/// `load` recovers metadata and visualization info from just the first
/// canvas, without needing the rest of the set to decode a payload.
#[test]
fn load_recovers_metadata_from_the_first_canvas_alone() {
    let payload = b"hello from the first canvas".to_vec();
    let mut metadata = Metadata::new();
    metadata.insert("filename", "hi.txt").unwrap();
    let options = EncodeOptions::default();

    let canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();

    let prepared = load(&canvases[0]).unwrap();
    assert_eq!(prepared.metadata.get("filename"), Some("hi.txt"));
    assert_eq!(prepared.visualization_metadata.version, 300);
    assert_eq!(prepared.visualization_metadata.m, 2);
}

/// A short payload with one metadata pair fits in a single canvas.
#[test]
fn small_payload_with_metadata_fits_a_single_canvas() {
    let payload = b"hello".to_vec();
    let mut metadata = Metadata::new();
    metadata.insert("filename", "hi.txt").unwrap();
    let mut options = EncodeOptions::default();
    options.mode = ColorMode::Expanded;

    let canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();
    assert_eq!(canvases.len(), 1);

    let result = decode(&canvases, None).unwrap();
    assert_eq!(result.data, payload);
}

/// A payload sized to exactly fill one small canvas produces one image;
/// one byte more produces two. Uses a tiny `max_dim` and compact/no-redundancy
/// options so the arithmetic is exact:
/// `fixed_bits = 88 (header) + 16 (metadata length) = 104`,
/// `blob_bits = 8 * (10 + payload_len)`, and at `max_dim = 64` a single
/// canvas holds exactly 1024 bits (`side = 32`, `32 * 2 <= 64`).
#[test]
fn boundary_payload_exactly_filling_one_canvas_vs_one_byte_more() {
    let metadata = Metadata::new();
    let mut options = EncodeOptions::default();
    options.max_dim = 64;
    options.mode = ColorMode::Compact;
    options.redundancy = 1;

    let exact = vec![0xABu8; 105]; // 104 + 8*(10+105) = 1024 bits exactly
    let canvases = encode(Input::Binary { data: &exact }, &metadata, &options).unwrap();
    assert_eq!(canvases.len(), 1);
    assert_eq!(decode(&canvases, None).unwrap().data, exact);

    let over = vec![0xABu8; 106]; // 104 + 8*(10+106) = 1032 bits, doesn't fit
    let canvases = encode(Input::Binary { data: &over }, &metadata, &options).unwrap();
    assert_eq!(canvases.len(), 2);
    assert_eq!(decode(&canvases, None).unwrap().data, over);
}

/// Empty metadata round-trips to an empty map.
#[test]
fn empty_metadata_decodes_to_an_empty_map() {
    let payload = b"no metadata here".to_vec();
    let metadata = Metadata::new();
    let options = EncodeOptions::default();

    let canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();
    match decode_metadata_only(&canvases).unwrap() {
        MetadataProbe::Binary { metadata: recovered, .. } => assert!(recovered.is_empty()),
        MetadataProbe::Audio { .. } => panic!("expected binary"),
    }
}

/// A zero-length payload is legal and still produces a valid checksum.
#[test]
fn zero_length_payload_is_legal() {
    let metadata = Metadata::new();
    let options = EncodeOptions::default();

    let canvases = encode(Input::Binary { data: &[] }, &metadata, &options).unwrap();
    let result = decode(&canvases, None).unwrap();
    assert!(result.data.is_empty());
    assert!(result.valid_checksum);
}

/// Any per-pixel perturbation within the threshold bands (here, +/- 48,
/// which never crosses the 64/192 boundary from the ON=247/OFF=8 levels
/// this encoder actually writes) must not change the decoded payload.
#[test]
fn tolerance_small_perturbations_do_not_change_the_decoded_payload() {
    let payload = lcg_bytes(2048, 0xFACE);
    let metadata = Metadata::new();
    let options = EncodeOptions::default();

    let mut canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();
    let baseline = decode(&canvases, None).unwrap().data;
    assert_eq!(baseline, payload);

    for canvas in &mut canvases {
        for chunk in canvas.data.chunks_exact_mut(4) {
            for channel in chunk.iter_mut().take(3) {
                *channel = if *channel >= 128 {
                    channel.saturating_sub(48)
                } else {
                    channel.saturating_add(48)
                };
            }
        }
    }

    let perturbed = decode(&canvases, None).unwrap().data;
    assert_eq!(perturbed, payload);
}

/// Flipping bit 3 of roughly 1% of pixels in a larger payload leaves health
/// high and the checksum still valid: a sparse minority of perturbed pixels
/// still averages toward the correct side of the threshold band in most
/// cells, and majority vote covers the rest.
#[test]
fn sparse_bit_flips_keep_checksum_valid_and_health_high() {
    let payload = lcg_bytes(100 * 1024, 0x5EED);
    let metadata = Metadata::new();
    let mut options = EncodeOptions::default();
    options.redundancy = 3;

    let mut canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();

    let mut toggled = 0u64;
    for canvas in &mut canvases {
        for (i, chunk) in canvas.data.chunks_exact_mut(4).enumerate() {
            if i % 100 == 0 {
                chunk[0] ^= 0x08; // bit 3
                toggled += 1;
            }
        }
    }
    assert!(toggled > 0);

    let mut debug = pxf::DebugInfo {
        row_health: Vec::new(),
        overall_health: 0.0
    };
    let result = decode(&canvases, Some(&mut debug)).unwrap();

    assert_eq!(result.data, payload);
    assert!(result.valid_checksum);
    assert!(debug.overall_health >= 0.95, "overall_health was {}", debug.overall_health);
}

/// Corrupting one payload cell after encoding must flip the checksum
/// verdict but still return a same-length payload.
#[test]
fn corrupted_payload_byte_fails_checksum_but_keeps_length() {
    let payload = lcg_bytes(512, 0xBADF00D);
    let metadata = Metadata::new();
    let options = EncodeOptions::default();

    let mut canvases = encode(Input::Binary { data: &payload }, &metadata, &options).unwrap();

    // Flip one whole cell deep in the data region of the first canvas, the
    // same technique `binary.rs`'s redundancy test uses, but with
    // redundancy=1 so there is no majority vote to mask the corruption.
    let canvas = &mut canvases[0];
    let m = 2u32;
    let cells_per_row = canvas.cells_per_row(m);
    let target_cell = 300u32.min(canvas.total_cells(m) as u32 - 1);
    let row = target_cell / cells_per_row;
    let col = target_cell % cells_per_row;
    pxf::cell::write_cell(canvas, row, col, m, (pxf::cell::OFF, pxf::cell::OFF, pxf::cell::OFF));

    let result = decode(&canvases, None).unwrap();
    assert_eq!(result.data.len(), payload.len());
    assert!(!result.valid_checksum);
}
