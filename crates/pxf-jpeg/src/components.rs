//! Per-component (per color plane) frame state.

use crate::errors::DecodeErrors;

/// Which role a component plays. PXF's own encoder only ever emits grayscale
/// or 3-component YCbCr JFIF, but a baseline decoder still has to read
/// whatever component ids a re-encoder happened to write.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComponentId {
    Y,
    Cb,
    Cr,
    Other(u8)
}

impl ComponentId {
    pub fn from_u8(id: u8) -> ComponentId {
        match id {
            1 => ComponentId::Y,
            2 => ComponentId::Cb,
            3 => ComponentId::Cr,
            other => ComponentId::Other(other)
        }
    }
}

/// State tracked for one component across header parsing and MCU decode.
#[derive(Debug, Clone)]
pub struct Component {
    /// The raw component identifier byte as written in the SOF marker; SOS
    /// component selectors are matched against this, not against
    /// [`ComponentId`] (some encoders use ids outside 1-3).
    pub raw_id: u8,
    pub id: ComponentId,
    /// Horizontal sampling factor, 1-4.
    pub horizontal_sample: usize,
    /// Vertical sampling factor, 1-4.
    pub vertical_sample: usize,
    /// Index into the frame's quantization tables.
    pub quantization_table: u8,
    /// Index into the frame's DC Huffman tables, bound by the SOS marker.
    pub dc_huffman_table: u8,
    /// Index into the frame's AC Huffman tables, bound by the SOS marker.
    pub ac_huffman_table: u8,
    /// Running DC predictor for this component, reset at restart intervals.
    pub dc_prediction: i32
}

impl Component {
    pub fn new(id: u8, horizontal_sample: usize, vertical_sample: usize, quantization_table: u8) -> Result<Component, DecodeErrors> {
        if horizontal_sample == 0 || horizontal_sample > 4 || vertical_sample == 0 || vertical_sample > 4 {
            return Err(DecodeErrors::CorruptJpeg(format!(
                "component {id} has an out-of-range sampling factor {horizontal_sample}x{vertical_sample}"
            )));
        }

        Ok(Component {
            raw_id: id,
            id: ComponentId::from_u8(id),
            horizontal_sample,
            vertical_sample,
            quantization_table,
            dc_huffman_table: 0,
            ac_huffman_table: 0,
            dc_prediction: 0
        })
    }
}
