//! Two-channel audio round-trips through the public facade,
//! `decode_metadata_only`'s audio arm, and the streaming decoder's
//! `decode_all`, within the expected quantization error bound.

use pxf::{decode_metadata_only, encode, EncodeOptions, Input, Metadata, MetadataProbe};

fn sine(n: usize, freq: f32, rate: f32) -> Vec<f32> {
    (0..n).map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin()).collect()
}

/// 1 s of two-channel audio at 8 kHz, 440 Hz sine on channel 0, silence
/// on channel 1.
#[test]
fn two_channel_audio_round_trips() {
    let ch0 = sine(8000, 440.0, 8000.0);
    let ch1 = vec![0.0f32; 8000];
    let metadata = Metadata::new();
    let options = EncodeOptions::default();

    let canvases = encode(
        Input::Audio {
            channels: &[ch0.clone(), ch1.clone()],
            sample_rate: 8000,
            bits_per_sample: Some(16)
        },
        &metadata,
        &options
    )
    .unwrap();
    assert_eq!(canvases.len(), 2);

    match decode_metadata_only(&canvases).unwrap() {
        MetadataProbe::Audio { sample_rate, decoder, .. } => {
            assert_eq!(sample_rate, 8000);
            assert_eq!(decoder.total_samples(), 8000);

            let full = decoder.decode_all();
            assert_eq!(full.channels.len(), 2);
            assert_eq!(full.channels[0].len(), 8000);
            assert_eq!(full.channels[1].len(), 8000);

            // Round-trip invariant 2: max error bounded by the 16-bit
            // quantization step.
            for (a, b) in ch0.iter().zip(full.channels[0].iter()) {
                assert!((a - b).abs() <= 2.0f32.powi(-14), "{a} vs {b}");
            }
            for &s in &full.channels[1] {
                assert!(s.abs() <= 2.0f32.powi(-14));
            }
        }
        MetadataProbe::Binary { .. } => panic!("expected an audio probe"),
    }
}
