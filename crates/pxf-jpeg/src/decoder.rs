//! Baseline JPEG decoding: marker parsing ties together in [`JpegDecoder`],
//! which [`decode_jpeg`] drives end to end.

use log::{debug, trace, warn};

use crate::bitstream::{BitStream, HuffmanTable};
use crate::color_convert::{luma_to_rgb, ycbcr_to_rgb};
use crate::components::Component;
use crate::errors::DecodeErrors;
use crate::idct::idct_block;
use crate::marker;
use crate::misc::{FrameKind, UN_ZIGZAG};
use crate::upsampler::NearestNeighborPlane;
use pxf_core::bytestream::ZByteReader;

/// A fully decoded image: interleaved 8-bit RGBA, row-major, no padding.
pub struct DecodedImage {
    pub width: u16,
    pub height: u16,
    pub rgba: Vec<u8>
}

/// True if `data` starts with the JPEG SOI marker.
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == marker::SOI
}

/// Decode a baseline (SOF0) JPEG held entirely in memory.
pub fn decode_jpeg(data: &[u8]) -> Result<DecodedImage, DecodeErrors> {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode()
}

pub struct JpegDecoder<'a> {
    pub(crate) stream: ZByteReader<'a>,
    pub(crate) quant_tables: [Option<[u16; 64]>; 4],
    pub(crate) dc_tables: [Option<HuffmanTable>; 4],
    pub(crate) ac_tables: [Option<HuffmanTable>; 4],
    pub(crate) components: Vec<Component>,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) restart_interval: u16,
    pub(crate) frame_kind: Option<FrameKind>,
    pub(crate) h_max: usize,
    pub(crate) v_max: usize,
    pub(crate) seen_sof: bool
}

impl<'a> JpegDecoder<'a> {
    pub fn new(data: &'a [u8]) -> JpegDecoder<'a> {
        JpegDecoder {
            stream: ZByteReader::new(data),
            quant_tables: [None, None, None, None],
            dc_tables: [None, None, None, None],
            ac_tables: [None, None, None, None],
            components: Vec::new(),
            width: 0,
            height: 0,
            restart_interval: 0,
            frame_kind: None,
            h_max: 1,
            v_max: 1,
            seen_sof: false
        }
    }

    pub fn decode(&mut self) -> Result<DecodedImage, DecodeErrors> {
        self.decode_headers()?;

        let remaining = self.stream.remaining();
        let entropy_data = self.stream.get_as_ref(remaining).map_err(DecodeErrors::from)?;

        let planes = self.decode_scan(entropy_data)?;

        Ok(self.assemble_rgba(&planes))
    }

    pub(crate) fn decode_headers(&mut self) -> Result<(), DecodeErrors> {
        let soi = self.stream.get_u16_be_err().map_err(DecodeErrors::from)?;

        if soi != 0xFFD8 {
            return Err(DecodeErrors::InvalidMagicBytes);
        }

        loop {
            let found = self.next_marker()?;
            trace!("marker 0xFF{found:02X} at byte {}", self.stream.position());

            match found {
                marker::SOF0 => self.parse_sof(marker::SOF0)?,
                marker::SOF1 | marker::SOF2 => {
                    let kind = FrameKind::from_marker(found).expect("matched above");
                    return Err(DecodeErrors::UnsupportedJpeg(kind.name()));
                }
                marker::DQT => self.parse_dqt()?,
                marker::DHT => self.parse_dht()?,
                marker::DRI => self.parse_dri()?,
                marker::DAC => return Err(DecodeErrors::UnsupportedJpeg("arithmetic coding (DAC marker)")),
                marker::SOS => {
                    self.parse_sos()?;
                    return Ok(());
                }
                marker::EOI => return Err(DecodeErrors::CorruptJpegStatic("end-of-image marker seen before a scan")),
                _ => self.skip_segment()?
            }
        }
    }

    /// Scan forward for the next marker byte, skipping fill bytes (runs of
    /// `0xFF`) and returning the byte that follows them.
    fn next_marker(&mut self) -> Result<u8, DecodeErrors> {
        loop {
            let byte = self.stream.get_u8_err().map_err(DecodeErrors::from)?;

            if byte != 0xFF {
                continue;
            }

            let mut candidate = self.stream.get_u8_err().map_err(DecodeErrors::from)?;
            while candidate == 0xFF {
                candidate = self.stream.get_u8_err().map_err(DecodeErrors::from)?;
            }

            if candidate == 0x00 {
                continue;
            }

            return Ok(candidate);
        }
    }

    fn skip_segment(&mut self) -> Result<(), DecodeErrors> {
        let length = self.stream.get_u16_be_err().map_err(DecodeErrors::from)?;

        if length < 2 {
            return Err(DecodeErrors::CorruptJpegStatic("marker segment length is smaller than its own length field"));
        }

        self.stream.skip(usize::from(length) - 2);
        Ok(())
    }

    /// Decode every MCU in the (single, interleaved) scan, returning one
    /// sample plane per frame component in frame order.
    fn decode_scan(&mut self, entropy_data: &'a [u8]) -> Result<Vec<Vec<u8>>, DecodeErrors> {
        if self.components.is_empty() {
            return Err(DecodeErrors::CorruptJpegStatic("no start-of-frame marker before scan data"));
        }

        let mcu_width = 8 * self.h_max;
        let mcu_height = 8 * self.v_max;
        let mcus_per_row = (usize::from(self.width) + mcu_width - 1) / mcu_width;
        let mcus_per_col = (usize::from(self.height) + mcu_height - 1) / mcu_height;

        let plane_dims: Vec<(usize, usize)> = self
            .components
            .iter()
            .map(|c| (mcus_per_row * c.horizontal_sample * 8, mcus_per_col * c.vertical_sample * 8))
            .collect();

        let mut planes: Vec<Vec<u8>> = plane_dims.iter().map(|&(w, h)| vec![0u8; w * h]).collect();

        for component in &mut self.components {
            component.dc_prediction = 0;
        }

        let mut stream = BitStream::new(entropy_data);
        let mut mcus_since_restart = 0u32;
        let mut expected_restart = 0u8;

        debug!(
            "decoding {}x{} MCU grid ({} components, restart_interval={})",
            mcus_per_row,
            mcus_per_col,
            self.components.len(),
            self.restart_interval
        );

        for mcu_row in 0..mcus_per_col {
            for mcu_col in 0..mcus_per_row {
                if self.restart_interval != 0 && mcus_since_restart == u32::from(self.restart_interval) {
                    self.handle_restart(&mut stream, &mut expected_restart);
                    mcus_since_restart = 0;
                }

                for (ci, component) in self.components.iter_mut().enumerate() {
                    let quant_table = self.quant_tables[usize::from(component.quantization_table)]
                        .ok_or_else(|| DecodeErrors::CorruptJpegStatic("component references a quantization table that was never defined"))?;
                    let dc_table = match self.dc_tables[usize::from(component.dc_huffman_table)].as_ref() {
                        Some(t) => t,
                        None => crate::annex_k::standard_dc_table(component.dc_huffman_table)?
                    };
                    let ac_table = match self.ac_tables[usize::from(component.ac_huffman_table)].as_ref() {
                        Some(t) => t,
                        None => crate::annex_k::standard_ac_table(component.ac_huffman_table)?
                    };

                    let (plane_w, _) = plane_dims[ci];
                    let plane = &mut planes[ci];

                    for by in 0..component.vertical_sample {
                        for bx in 0..component.horizontal_sample {
                            let coeffs = decode_block(&mut stream, dc_table, ac_table, &mut component.dc_prediction)?;

                            let origin_x = (mcu_col * component.horizontal_sample + bx) * 8;
                            let origin_y = (mcu_row * component.vertical_sample + by) * 8;
                            let offset = origin_y * plane_w + origin_x;

                            idct_block(&coeffs, &quant_table, &mut plane[offset..], plane_w);
                        }
                    }
                }

                mcus_since_restart += 1;
            }
        }

        Ok(planes)
    }

    fn handle_restart(&mut self, stream: &mut BitStream<'_>, expected: &mut u8) {
        match stream.marker {
            Some(m) if marker::is_restart(m) => {
                if m != marker::RST0 + expected.rem_euclid(8) {
                    warn!("restart marker 0x{m:02X} out of sequence, resynchronizing anyway");
                }
                let _ = stream.consume_marker();
            }
            Some(m) => {
                warn!("expected a restart marker but found 0x{m:02X}, resetting state and continuing");
            }
            None => {
                warn!("restart interval elapsed but no restart marker was present in the stream");
            }
        }

        stream.reset();
        *expected = (*expected + 1) % 8;

        for component in &mut self.components {
            component.dc_prediction = 0;
        }
    }

    fn assemble_rgba(&self, planes: &[Vec<u8>]) -> DecodedImage {
        let mcu_width = 8 * self.h_max;
        let mcu_height = 8 * self.v_max;
        let mcus_per_row = (usize::from(self.width) + mcu_width - 1) / mcu_width;

        let width = usize::from(self.width);
        let height = usize::from(self.height);
        let mut rgba = vec![0u8; width * height * 4];

        let views: Vec<NearestNeighborPlane> = self
            .components
            .iter()
            .zip(planes.iter())
            .map(|(c, plane)| {
                let plane_w = mcus_per_row * c.horizontal_sample * 8;
                NearestNeighborPlane::new(plane, plane_w, self.h_max / c.horizontal_sample, self.v_max / c.vertical_sample)
            })
            .collect();

        for y in 0..height {
            for x in 0..width {
                let (r, g, b) = match views.len() {
                    1 => luma_to_rgb(views[0].get(x, y)),
                    3 => ycbcr_to_rgb(views[0].get(x, y), views[1].get(x, y), views[2].get(x, y)),
                    _ => luma_to_rgb(views[0].get(x, y))
                };

                let offset = (y * width + x) * 4;
                rgba[offset] = r;
                rgba[offset + 1] = g;
                rgba[offset + 2] = b;
                rgba[offset + 3] = 255;
            }
        }

        DecodedImage {
            width: self.width,
            height: self.height,
            rgba
        }
    }
}

fn decode_block(stream: &mut BitStream<'_>, dc_table: &HuffmanTable, ac_table: &HuffmanTable, dc_prediction: &mut i32) -> Result<[i32; 64], DecodeErrors> {
    let mut coeffs = [0i32; 64];

    let size = dc_table.decode(stream)?;
    let diff = stream.receive_extend(size);
    *dc_prediction += diff;
    coeffs[0] = *dc_prediction;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode(stream)?;
        let run = rs >> 4;
        let size = rs & 0x0F;

        if size == 0 {
            if run == 15 {
                k += 16; // ZRL: 16 zero coefficients
                continue;
            }
            break; // EOB
        }

        k += usize::from(run);
        if k >= 64 {
            return Err(DecodeErrors::CorruptJpegStatic("AC run length ran past the end of a block"));
        }

        coeffs[UN_ZIGZAG[k]] = stream.receive_extend(size);
        k += 1;
    }

    Ok(coeffs)
}
