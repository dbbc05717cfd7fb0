//! Encoder configuration, in the style of `zune_core::options::DecoderOptions`:
//! a small, fully public, individually documented struct with a sane
//! `Default`.

/// Which channel mode the encoder should use.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ColorMode {
    /// Pick compact or expanded automatically, based on which packs the
    /// payload into fewer cells. See [`EncodeOptions`] for the heuristic.
    #[default]
    Auto,
    /// One bit per cell, replicated across R, G, and B.
    Compact,
    /// Three bits per cell, one per channel.
    Expanded
}

/// Tunable parameters for [`crate::binary::PxfEncoder`] and
/// [`crate::audio::encode_audio`].
#[derive(Copy, Clone, Debug)]
pub struct EncodeOptions {
    /// Largest width or height, in pixels, a single canvas may have. The
    /// encoder splits the payload across multiple canvases rather than
    /// exceed this.
    pub max_dim: u32,
    /// Compact vs. expanded channel packing.
    pub mode: ColorMode,
    /// How many consecutive cells carry each logical bit, for majority-vote
    /// tolerance against per-pixel corruption. One of 1, 3, or 5.
    pub redundancy: u8
}

impl Default for EncodeOptions {
    fn default() -> EncodeOptions {
        EncodeOptions {
            max_dim: 4096,
            mode: ColorMode::Auto,
            redundancy: 1
        }
    }
}

impl EncodeOptions {
    /// Resolve [`ColorMode::Auto`] against a concrete bit count, using the
    /// heuristic: prefer compact unless expanded would pack
    /// noticeably (10%) tighter, since a compact canvas survives a lossy
    /// transport more reliably than a smaller one with 3x the channel
    /// bandwidth per cell.
    pub fn resolve_mode(&self, total_bits: u64) -> crate::cell::Mode {
        match self.mode {
            ColorMode::Compact => crate::cell::Mode::Compact,
            ColorMode::Expanded => crate::cell::Mode::Expanded,
            ColorMode::Auto => {
                let cell_budget_compact = total_bits;
                let cell_budget_expanded = (total_bits + 2) / 3;
                if (cell_budget_expanded as f64) * 1.1 < cell_budget_compact as f64 {
                    crate::cell::Mode::Expanded
                } else {
                    crate::cell::Mode::Compact
                }
            }
        }
    }
}
