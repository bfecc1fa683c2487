//! Bitmap to raster row conversion.

use crate::{bitmap::Bitmap, device::DriverDescriptor};

/// Bit-packed raster rows in head feed order, feed padding included.
#[derive(Debug)]
pub struct RasterJob {
    rows: Vec<Vec<u8>>,
    row_bytes: usize,
}

impl RasterJob {
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Total row count, trailing feed rows included. This is the count
    /// the media declaration on the wire must carry.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Convert a bitmap into the row sequence a print head clocks in.
///
/// Each source pixel column becomes one packed row of
/// `ceil(raster_px / 8)` bytes, bit 7 of byte 0 being the first physical
/// dot. The image is centered on the head, or cropped symmetrically when
/// taller than the head. Rows are collected in reverse scan order because
/// the feed direction opposes the image x axis, and `feed_end_px` blank
/// rows are appended to push the label past the knife.
pub fn rasterize(bitmap: &Bitmap, desc: &DriverDescriptor) -> RasterJob {
    let row_bytes = desc.row_bytes();
    let head = desc.head_width_px;
    let bias = desc.head_bias_px();

    let (height, src_offset, dst_offset) = if bitmap.height() > head {
        (head, (bitmap.height() - head) / 2, 0)
    } else {
        (bitmap.height(), 0, (head - bitmap.height()) / 2)
    };

    let total = bitmap.width() as usize + desc.feed_end_px as usize;
    let mut rows: Vec<Vec<u8>> = Vec::with_capacity(total);

    for x in 0..bitmap.width() {
        let mut row = vec![0u8; row_bytes];

        for y in 0..height {
            // Some heads take dots in reverse of scan order.
            let scan_y = if desc.mirror_dots { height - 1 - y } else { y };
            if bitmap.is_ink(x, scan_y + src_offset) {
                let y_out = (bias + dst_offset + y) as usize;
                row[y_out >> 3] |= 1 << (7 - (y_out & 0x7));
            }
        }

        rows.push(row);
    }

    // First source column must be the last row sent.
    rows.reverse();

    for _ in 0..desc.feed_end_px {
        rows.push(vec![0u8; row_bytes]);
    }

    RasterJob { rows, row_bytes }
}
