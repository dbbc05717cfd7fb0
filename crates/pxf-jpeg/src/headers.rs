//! Marker segment parsing: DQT, DHT, SOF0, DRI, SOS.

use crate::bitstream::HuffmanTable;
use crate::components::Component;
use crate::decoder::JpegDecoder;
use crate::errors::DecodeErrors;
use crate::misc::{FrameKind, UN_ZIGZAG};

impl<'a> JpegDecoder<'a> {
    pub(crate) fn parse_dqt(&mut self) -> Result<(), DecodeErrors> {
        let length = self.stream.get_u16_be_err()?;
        let mut remaining = i32::from(length) - 2;

        while remaining > 0 {
            let pq_tq = self.stream.get_u8_err()?;
            let precision = pq_tq >> 4;
            let index = usize::from(pq_tq & 0x0F);

            if index >= 4 {
                return Err(DecodeErrors::CorruptJpeg(format!("quantization table index {index} out of range")));
            }

            let mut table = [0u16; 64];

            if precision == 0 {
                for &natural in UN_ZIGZAG.iter() {
                    table[natural] = u16::from(self.stream.get_u8_err()?);
                }
                remaining -= 1 + 64;
            } else {
                for &natural in UN_ZIGZAG.iter() {
                    table[natural] = self.stream.get_u16_be_err()?;
                }
                remaining -= 1 + 128;
            }

            self.quant_tables[index] = Some(table);
        }

        Ok(())
    }

    pub(crate) fn parse_dht(&mut self) -> Result<(), DecodeErrors> {
        let length = self.stream.get_u16_be_err()?;
        let mut remaining = i32::from(length) - 2;

        while remaining > 0 {
            let ht_info = self.stream.get_u8_err()?;
            let is_ac = ht_info >> 4 != 0;
            let index = usize::from(ht_info & 0x0F);

            if index >= 4 {
                return Err(DecodeErrors::CorruptJpeg(format!("Huffman table index {index} out of range")));
            }

            let mut counts = [0u8; 16];
            let mut total = 0usize;

            for count in counts.iter_mut() {
                *count = self.stream.get_u8_err()?;
                total += usize::from(*count);
            }

            if total > 256 {
                return Err(DecodeErrors::CorruptJpegStatic("Huffman table declares more than 256 symbols"));
            }

            let mut values = Vec::with_capacity(total);
            for _ in 0..total {
                values.push(self.stream.get_u8_err()?);
            }

            let table = HuffmanTable::new(&counts, values)?;

            if is_ac {
                self.ac_tables[index] = Some(table);
            } else {
                self.dc_tables[index] = Some(table);
            }

            remaining -= 1 + 16 + total as i32;
        }

        Ok(())
    }

    pub(crate) fn parse_sof(&mut self, marker: u8) -> Result<(), DecodeErrors> {
        if self.seen_sof {
            return Err(DecodeErrors::CorruptJpegStatic("duplicate start-of-frame marker"));
        }

        let _length = self.stream.get_u16_be_err()?;
        let precision = self.stream.get_u8_err()?;

        if precision != 8 {
            return Err(DecodeErrors::UnsupportedJpeg("sample precision other than 8 bits per component"));
        }

        let height = self.stream.get_u16_be_err()?;
        let width = self.stream.get_u16_be_err()?;

        if width == 0 || height == 0 {
            return Err(DecodeErrors::CorruptJpegStatic("frame declares a zero-sized image"));
        }

        let num_components = self.stream.get_u8_err()?;

        if num_components == 0 || num_components > 4 {
            return Err(DecodeErrors::UnsupportedJpeg("component count outside 1-4"));
        }

        let mut components = Vec::with_capacity(usize::from(num_components));
        let mut h_max = 1usize;
        let mut v_max = 1usize;

        for _ in 0..num_components {
            let id = self.stream.get_u8_err()?;
            let sampling = self.stream.get_u8_err()?;
            let h = usize::from(sampling >> 4);
            let v = usize::from(sampling & 0x0F);
            let quant_idx = self.stream.get_u8_err()?;

            h_max = h_max.max(h);
            v_max = v_max.max(v);
            components.push(Component::new(id, h, v, quant_idx)?);
        }

        self.width = width;
        self.height = height;
        self.h_max = h_max;
        self.v_max = v_max;
        self.components = components;
        self.frame_kind = FrameKind::from_marker(marker);
        self.seen_sof = true;

        Ok(())
    }

    pub(crate) fn parse_dri(&mut self) -> Result<(), DecodeErrors> {
        let _length = self.stream.get_u16_be_err()?;
        self.restart_interval = self.stream.get_u16_be_err()?;
        Ok(())
    }

    pub(crate) fn parse_sos(&mut self) -> Result<(), DecodeErrors> {
        if !self.seen_sof {
            return Err(DecodeErrors::CorruptJpegStatic("start-of-scan marker seen before start-of-frame"));
        }

        let _length = self.stream.get_u16_be_err()?;
        let scan_components = self.stream.get_u8_err()?;

        if usize::from(scan_components) != self.components.len() {
            return Err(DecodeErrors::UnsupportedJpeg(
                "scan does not cover every frame component (non-interleaved or partial scans)"
            ));
        }

        for _ in 0..scan_components {
            let selector = self.stream.get_u8_err()?;
            let tables = self.stream.get_u8_err()?;
            let dc_index = tables >> 4;
            let ac_index = tables & 0x0F;

            let component = self
                .components
                .iter_mut()
                .find(|c| c.raw_id == selector)
                .ok_or_else(|| DecodeErrors::CorruptJpeg(format!("scan selector {selector} matches no frame component")))?;

            component.dc_huffman_table = dc_index;
            component.ac_huffman_table = ac_index;
        }

        // Spectral selection and successive approximation: fixed at 0, 63, 0
        // for baseline and only meaningful for progressive scans.
        let _spectral_start = self.stream.get_u8_err()?;
        let _spectral_end = self.stream.get_u8_err()?;
        let _approximation = self.stream.get_u8_err()?;

        Ok(())
    }
}
