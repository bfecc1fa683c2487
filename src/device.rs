//! Per-family device constants.

use crate::error::Error;

/// How a tape width in millimeters maps to printable dots.
#[derive(Debug, Clone, Copy)]
pub enum WidthMap {
    /// Discrete set of supported cassette widths, `(mm, dots)`.
    Table(&'static [(u32, u32)]),
    /// `dots = mm * num / den`, any width accepted.
    Linear { num: u32, den: u32 },
}

/// Immutable constants of one device family.
///
/// Built once per family and passed explicitly wherever needed; there is
/// no process-wide printer state.
#[derive(Debug, Clone, Copy)]
pub struct DriverDescriptor {
    /// Human readable device name, shown by scan listings.
    pub description: &'static str,
    /// Physical dots across the print head.
    pub head_width_px: u32,
    /// Dots per raster row on the wire. May exceed the head span when
    /// the protocol places the head in the middle of a wider raster.
    pub raster_px: u32,
    /// Feed the printer always performs before the first printed row.
    pub feed_start_px: u32,
    /// Shortest label that can still be pulled out of the mechanism.
    pub feed_min_length_px: u32,
    /// Blank rows appended after the image to push it past the knife.
    pub feed_end_px: u32,
    /// Whether the head consumes dots in reverse of image scan order.
    pub mirror_dots: bool,
    pub widths: WidthMap,
}

impl DriverDescriptor {
    /// Bytes in one packed raster row.
    pub fn row_bytes(&self) -> usize {
        (self.raster_px as usize + 7) / 8
    }

    /// Dots between the raster edge and the first physical head dot.
    pub fn head_bias_px(&self) -> u32 {
        (self.raster_px - self.head_width_px) / 2
    }

    /// Map a tape width in millimeters to printable dots.
    pub fn mm_to_px(&self, mm: u32) -> Result<u32, Error> {
        match self.widths {
            WidthMap::Table(table) => table
                .iter()
                .find(|(width, _)| *width == mm)
                .map(|(_, px)| *px)
                .ok_or(Error::UnsupportedWidth(mm)),
            WidthMap::Linear { num, den } => Ok(mm * num / den),
        }
    }
}
