//! Decoded image contract between the renderer and the drivers.

use crate::error::Error;

/// Monochrome label image as handed over by the text renderer.
///
/// Pixels are 8-bit RGBA, row-major, top-to-bottom. The renderer emits
/// monochrome data, so only the red channel is sampled when deciding
/// whether a dot burns.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Wrap a decoded pixel buffer, validating its size.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Error> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidBitmap(format!(
                "pixel buffer is {} bytes, {}x{} RGBA needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Bitmap {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA samples, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// `true` when the pixel at (x, y) should burn a dot.
    ///
    /// Threshold is luminance 127: anything brighter is background.
    /// No gray levels survive into the protocol.
    pub(crate) fn is_ink(&self, x: u32, y: u32) -> bool {
        let index = ((y * self.width + x) * 4) as usize;
        self.pixels[index] <= 127
    }
}
