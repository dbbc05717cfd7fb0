//! Inverse DCT.
//!
//! A direct, separable implementation of the Annex A.3.3 basis (row pass
//! then column pass), rather than a hand-tuned AAN fixed-point variant:
//! PXF's JPEG front end has to interoperate with whatever re-encoder
//! a transport ran the canvas through, not just with images its own encoder
//! produced, so bit-exactness with one particular fast IDCT matters less
//! here than staying an obviously-correct reading of the standard formula.

use std::sync::OnceLock;

const PI: f32 = std::f32::consts::PI;

fn basis() -> &'static [[f32; 8]; 8] {
    static BASIS: OnceLock<[[f32; 8]; 8]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut table = [[0f32; 8]; 8];
        for (x, row) in table.iter_mut().enumerate() {
            for (u, cell) in row.iter_mut().enumerate() {
                *cell = ((2 * x + 1) as f32 * u as f32 * PI / 16.0).cos();
            }
        }
        table
    })
}

#[inline]
fn c(u: usize) -> f32 {
    if u == 0 {
        std::f32::consts::FRAC_1_SQRT_2
    } else {
        1.0
    }
}

#[inline]
fn clamp(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Dequantize `coefficients` (natural order: `coefficients[v * 8 + u]` holds
/// the coefficient at horizontal frequency `u`, vertical frequency `v`)
/// against `quant_table` (same order), run the 8x8 inverse DCT and level
/// shift, and write the clamped samples into `out[row * stride + col]`.
pub fn idct_block(coefficients: &[i32; 64], quant_table: &[u16; 64], out: &mut [u8], stride: usize) {
    let mut freq = [0f32; 64];
    for i in 0..64 {
        freq[i] = (coefficients[i] * i32::from(quant_table[i])) as f32;
    }

    if freq[1..].iter().all(|&v| v == 0.0) {
        let flat = clamp(freq[0] / 8.0 + 128.0);
        for row in 0..8 {
            for col in 0..8 {
                out[row * stride + col] = flat;
            }
        }
        return;
    }

    let cos = basis();

    // Row pass: horizontal frequency (u) -> horizontal spatial (x), for
    // every vertical frequency v.
    let mut row_pass = [[0f32; 8]; 8];
    for v in 0..8 {
        for x in 0..8 {
            let mut sum = 0f32;
            for u in 0..8 {
                sum += c(u) * freq[v * 8 + u] * cos[x][u];
            }
            row_pass[v][x] = sum;
        }
    }

    // Column pass: vertical frequency (v) -> vertical spatial (y), for
    // every horizontal spatial x already produced above.
    for x in 0..8 {
        for y in 0..8 {
            let mut sum = 0f32;
            for v in 0..8 {
                sum += c(v) * row_pass[v][x] * cos[y][v];
            }
            out[y * stride + x] = clamp(sum / 4.0 + 128.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_block_is_mid_gray() {
        let coeffs = [0i32; 64];
        let quant = [1u16; 64];
        let mut out = [0u8; 64];
        idct_block(&coeffs, &quant, &mut out, 8);
        assert!(out.iter().all(|&s| s == 128));
    }

    #[test]
    fn dc_only_block_is_flat_and_matches_formula() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 2;
        let mut quant = [1u16; 64];
        quant[0] = 8; // dequantized DC = 16

        let mut out = [0u8; 64];
        idct_block(&coeffs, &quant, &mut out, 8);

        let expected = (16f32 / 8.0 + 128.0).round() as u8;
        assert!(out.iter().all(|&s| s == expected));
    }

    #[test]
    fn nonzero_ac_produces_non_flat_block() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 4;
        coeffs[1] = 2; // a horizontal AC term
        let quant = [1u16; 64];

        let mut out = [0u8; 64];
        idct_block(&coeffs, &quant, &mut out, 8);

        assert!(out.iter().any(|&s| s != out[0]));
    }
}
