//! Bit-layout primitives: the mapping between a bit stream and macroblocks
//! of a [`RawImageData`] canvas.

use crate::canvas::RawImageData;

/// Color value a cell writes for a clear (non-erased) bit.
pub const ON: u8 = 247;
pub const OFF: u8 = 8;
/// Neutral fill written to cells with no data (the last, partial row).
pub const FILL: (u8, u8, u8) = (128, 128, 128);

#[inline]
pub fn bit_value(bit: u8) -> u8 {
    if bit != 0 {
        ON
    } else {
        OFF
    }
}

/// The result of reading one channel of one cell.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Sample {
    Bit(u8),
    Erased
}

/// Classify an averaged channel value into the threshold bands: below 64
/// is a clear 0, above 192 a clear 1, the middle band (JPEG ringing
/// territory) is erased.
#[inline]
pub fn classify(average: u8) -> Sample {
    if average < 64 {
        Sample::Bit(0)
    } else if average > 192 {
        Sample::Bit(1)
    } else {
        Sample::Erased
    }
}

/// Whether a cell carries one bit replicated across RGB, or three
/// independent bits, one per channel.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Mode {
    Compact,
    Expanded
}

impl Mode {
    pub const fn bits_per_cell(self) -> u8 {
        match self {
            Mode::Compact => 1,
            Mode::Expanded => 3
        }
    }
}

/// Write `rgb` into the `M x M` pixel region at cell `(row, col)`.
pub fn write_cell(canvas: &mut RawImageData, row: u32, col: u32, m: u32, rgb: (u8, u8, u8)) {
    let (r, g, b) = rgb;
    let base_x = col * m;
    let base_y = row * m;

    for dy in 0..m {
        for dx in 0..m {
            canvas.set_pixel(base_x + dx, base_y + dy, r, g, b);
        }
    }
}

/// Average each channel over the inner `(M-2) x (M-2)` window (or the
/// whole cell when `M < 3`) and classify the result per-channel.
pub fn read_cell(canvas: &RawImageData, row: u32, col: u32, m: u32) -> (Sample, Sample, Sample) {
    let (inset, window) = if m >= 3 { (1, m - 2) } else { (0, m) };
    let base_x = col * m + inset;
    let base_y = row * m + inset;

    let mut sum = (0u32, 0u32, 0u32);
    let mut count = 0u32;

    for dy in 0..window {
        for dx in 0..window {
            let (r, g, b, _) = canvas.get_pixel(base_x + dx, base_y + dy);
            sum.0 += u32::from(r);
            sum.1 += u32::from(g);
            sum.2 += u32::from(b);
            count += 1;
        }
    }

    let count = count.max(1);
    (classify((sum.0 / count) as u8), classify((sum.1 / count) as u8), classify((sum.2 / count) as u8))
}

/// Resolve `R` redundant samples of the same logical bit by majority vote,
/// ignoring erasures. Ties (including "every copy erased") resolve to bit 0
/// and are themselves reported as erased — erasures are treated as 0
/// downstream.
pub fn majority_vote(samples: &[Sample]) -> (u8, bool) {
    let mut ones = 0u32;
    let mut zeros = 0u32;

    for sample in samples {
        match sample {
            Sample::Bit(1) => ones += 1,
            Sample::Bit(_) => zeros += 1,
            Sample::Erased => {}
        }
    }

    if ones > zeros {
        (1, false)
    } else if zeros > ones {
        (0, false)
    } else {
        (0, true)
    }
}

/// Writes a logical bit stream into a canvas's cells, in row-major order,
/// honoring the configured mode and redundancy.
pub struct CellWriter<'a> {
    canvas: &'a mut RawImageData,
    m: u32,
    mode: Mode,
    redundancy: u8,
    cells_per_row: u32,
    slot_cursor: u64,
    pending: Vec<u8>
}

impl<'a> CellWriter<'a> {
    pub fn new(canvas: &'a mut RawImageData, m: u32, mode: Mode, redundancy: u8) -> CellWriter<'a> {
        let cells_per_row = canvas.cells_per_row(m);
        CellWriter {
            canvas,
            m,
            mode,
            redundancy,
            cells_per_row,
            slot_cursor: 0,
            pending: Vec::with_capacity(3)
        }
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.pending.push(bit & 1);
        if self.pending.len() == usize::from(self.mode.bits_per_cell()) {
            self.flush_slot();
        }
    }

    pub fn write_bits(&mut self, bits: &[u8]) {
        for &bit in bits {
            self.write_bit(bit);
        }
    }

    /// Flush a partially filled final group, zero-padding it. The decoder
    /// never reads past the bit counts recorded in the frame header, so
    /// padding bits are never observed.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            while self.pending.len() < usize::from(self.mode.bits_per_cell()) {
                self.pending.push(0);
            }
            self.flush_slot();
        }
    }

    fn flush_slot(&mut self) {
        let rgb = match self.mode {
            Mode::Compact => {
                let v = bit_value(self.pending[0]);
                (v, v, v)
            }
            Mode::Expanded => (bit_value(self.pending[0]), bit_value(self.pending[1]), bit_value(self.pending[2]))
        };

        let first_cell = self.slot_cursor * u64::from(self.redundancy);
        for copy in 0..u64::from(self.redundancy) {
            let cell_index = first_cell + copy;
            let row = (cell_index / u64::from(self.cells_per_row)) as u32;
            let col = (cell_index % u64::from(self.cells_per_row)) as u32;
            write_cell(self.canvas, row, col, self.m, rgb);
        }

        self.slot_cursor += 1;
        self.pending.clear();
    }

    /// Fill every remaining cell in the canvas with the neutral fill
    /// pattern, from the writer's current position to the end.
    pub fn fill_remaining(&mut self) {
        let total_cells = self.canvas.total_cells(self.m);
        let next_cell = self.slot_cursor * u64::from(self.redundancy);

        for cell_index in next_cell..total_cells {
            let row = (cell_index / u64::from(self.cells_per_row)) as u32;
            let col = (cell_index % u64::from(self.cells_per_row)) as u32;
            write_cell(self.canvas, row, col, self.m, FILL);
        }
    }
}

/// Per-row erasure bookkeeping for the health report.
#[derive(Clone, Debug, Default)]
pub struct RowHealth {
    pub row: u32,
    pub cells: u32,
    pub erased: u32
}

impl RowHealth {
    pub fn health(&self) -> f64 {
        if self.cells == 0 {
            1.0
        } else {
            1.0 - f64::from(self.erased) / f64::from(self.cells)
        }
    }
}

/// Reads a logical bit stream back out of a canvas's cells, tracking
/// per-row erasure counts as it goes.
pub struct CellReader<'a> {
    canvas: &'a RawImageData,
    m: u32,
    mode: Mode,
    redundancy: u8,
    cells_per_row: u32,
    slot_cursor: u64,
    pending_bits: Vec<u8>,
    pub row_health: Vec<RowHealth>
}

impl<'a> CellReader<'a> {
    pub fn new(canvas: &'a RawImageData, m: u32, mode: Mode, redundancy: u8) -> CellReader<'a> {
        let cells_per_row = canvas.cells_per_row(m);
        let cell_rows = canvas.cell_rows(m);
        let row_health = (0..cell_rows)
            .map(|row| RowHealth {
                row,
                cells: cells_per_row,
                erased: 0
            })
            .collect();

        CellReader {
            canvas,
            m,
            mode,
            redundancy,
            cells_per_row,
            slot_cursor: 0,
            pending_bits: Vec::new(),
            row_health
        }
    }

    /// Read exactly `n` logical bits.
    pub fn read_bits(&mut self, n: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(n as usize);

        while (out.len() as u64) < n {
            if self.pending_bits.is_empty() {
                self.decode_next_slot();
            }
            out.push(self.pending_bits.remove(0));
        }

        out
    }

    fn decode_next_slot(&mut self) {
        let first_cell = self.slot_cursor * u64::from(self.redundancy);

        let mut r_samples = Vec::with_capacity(usize::from(self.redundancy));
        let mut g_samples = Vec::with_capacity(usize::from(self.redundancy));
        let mut b_samples = Vec::with_capacity(usize::from(self.redundancy));
        let mut touched_rows = Vec::with_capacity(usize::from(self.redundancy));

        for copy in 0..u64::from(self.redundancy) {
            let cell_index = first_cell + copy;
            let row = (cell_index / u64::from(self.cells_per_row)) as u32;
            let col = (cell_index % u64::from(self.cells_per_row)) as u32;
            touched_rows.push(row);

            let (r, g, b) = read_cell(self.canvas, row, col, self.m);
            r_samples.push(r);
            g_samples.push(g);
            b_samples.push(b);
        }

        let (r_bit, r_erased) = majority_vote(&r_samples);
        let any_erased = match self.mode {
            Mode::Compact => r_erased,
            Mode::Expanded => {
                let (_, g_erased) = majority_vote(&g_samples);
                let (_, b_erased) = majority_vote(&b_samples);
                r_erased || g_erased || b_erased
            }
        };

        if any_erased {
            if let Some(&row) = touched_rows.first() {
                if let Some(entry) = self.row_health.get_mut(row as usize) {
                    entry.erased += 1;
                }
            }
        }

        match self.mode {
            Mode::Compact => self.pending_bits.push(r_bit),
            Mode::Expanded => {
                let (g_bit, _) = majority_vote(&g_samples);
                let (b_bit, _) = majority_vote(&b_samples);
                self.pending_bits.extend_from_slice(&[r_bit, g_bit, b_bit]);
            }
        }

        self.slot_cursor += 1;
    }

    pub fn overall_health(&self) -> f64 {
        if self.row_health.is_empty() {
            return 1.0;
        }

        let sum: f64 = self.row_health.iter().map(RowHealth::health).sum();
        sum / self.row_health.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_cell_round_trips_through_a_canvas() {
        let mut canvas = RawImageData::new(8, 8);
        {
            let mut writer = CellWriter::new(&mut canvas, 4, Mode::Compact, 1);
            writer.write_bits(&[1, 0, 1, 1]);
            writer.finish();
        }

        let mut reader = CellReader::new(&canvas, 4, Mode::Compact, 1);
        assert_eq!(reader.read_bits(4), vec![1, 0, 1, 1]);
    }

    #[test]
    fn expanded_cell_packs_three_bits_per_cell() {
        let mut canvas = RawImageData::new(4, 4);
        {
            let mut writer = CellWriter::new(&mut canvas, 4, Mode::Expanded, 1);
            writer.write_bits(&[1, 0, 1]);
            writer.finish();
        }

        let mut reader = CellReader::new(&canvas, 4, Mode::Expanded, 1);
        assert_eq!(reader.read_bits(3), vec![1, 0, 1]);
    }

    #[test]
    fn redundancy_survives_a_minority_of_flipped_copies() {
        let mut canvas = RawImageData::new(4, 12);
        {
            let mut writer = CellWriter::new(&mut canvas, 4, Mode::Compact, 3);
            writer.write_bit(1);
            writer.finish();
        }

        // Corrupt one of the three redundant cells into a clear 0.
        for y in 4..8 {
            for x in 0..4 {
                canvas.set_pixel(x, y, OFF, OFF, OFF);
            }
        }

        let mut reader = CellReader::new(&canvas, 4, Mode::Compact, 3);
        assert_eq!(reader.read_bits(1), vec![1]);
    }

    #[test]
    fn mid_band_average_is_erased() {
        let canvas = {
            let mut c = RawImageData::new(4, 4);
            for y in 0..4 {
                for x in 0..4 {
                    c.set_pixel(x, y, 128, 128, 128);
                }
            }
            c
        };

        let mut reader = CellReader::new(&canvas, 4, Mode::Compact, 1);
        let bits = reader.read_bits(1);
        // Erased resolves to 0 downstream but is counted against row health.
        assert_eq!(bits, vec![0]);
        assert!(reader.overall_health() < 1.0);
    }
}
