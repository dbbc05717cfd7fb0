//! CRC-32 (IEEE 802.3), used for the frame trailer.
//!
//! This crate deliberately does not pull in a `crc`/`crc32fast` dependency:
//! the table-based algorithm is a couple dozen lines and none of the other
//! crates this workspace is grounded on reach for an external crate for it
//! either (`zune-png` computes its own, see `crc::crc32_slice8` referenced
//! from its chunk-validation code).

const POLY: u32 = 0xEDB8_8320;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut byte = 0usize;

    while byte < 256 {
        let mut crc = byte as u32;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }

        table[byte] = crc;
        byte += 1;
    }

    table
}

static TABLE: [u32; 256] = build_table();

/// A CRC-32 accumulator, for computing a checksum over data that arrives in
/// more than one chunk (payload-length field, then payload bytes).
#[derive(Copy, Clone)]
pub struct Crc32 {
    state: u32
}

impl Default for Crc32 {
    fn default() -> Self {
        Crc32::new()
    }
}

impl Crc32 {
    pub const fn new() -> Crc32 {
        Crc32 { state: u32::MAX }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.state;

        for &byte in bytes {
            let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
            crc = (crc >> 8) ^ TABLE[idx];
        }

        self.state = crc;
    }

    pub fn finalize(self) -> u32 {
        self.state ^ u32::MAX
    }
}

/// Convenience one-shot CRC-32 over a single buffer.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // "123456789" -> 0xCBF43926 is the standard CRC-32/ISO-HDLC check value.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut acc = Crc32::new();
        acc.update(b"hel");
        acc.update(b"lo");
        assert_eq!(acc.finalize(), crc32(b"hello"));
    }
}
