//! Preview pseudo-driver.
//!
//! Hands the rendered label to an external image viewer instead of a
//! printer. Selectable by name only; `find` always reports false so
//! auto-detection never lands here.

use log::debug;
use std::path::PathBuf;
use std::process::Command;

use crate::{
    bitmap::Bitmap,
    device::{DriverDescriptor, WidthMap},
    error::Error,
    printer::{Driver, PrintOptions},
};

const VIEW_DESCRIPTOR: DriverDescriptor = DriverDescriptor {
    description: "Image viewer (for debug)",
    head_width_px: 64,
    raster_px: 64,
    // No real feed mechanics behind a screen.
    feed_start_px: 0,
    feed_min_length_px: 0,
    feed_end_px: 0,
    mirror_dots: false,
    widths: WidthMap::Linear { num: 16, den: 3 },
};

pub(crate) struct View;

impl Driver for View {
    fn name(&self) -> &'static str {
        "view"
    }

    fn descriptor(&self) -> &DriverDescriptor {
        &VIEW_DESCRIPTOR
    }

    fn find(&self) -> bool {
        false
    }

    fn print(&self, bitmap: &Bitmap, options: &PrintOptions) -> Result<(), Error> {
        let image = image::RgbaImage::from_raw(
            bitmap.width(),
            bitmap.height(),
            bitmap.pixels().to_vec(),
        )
        .ok_or_else(|| Error::InvalidBitmap("pixel buffer does not match dimensions".into()))?;

        let path: PathBuf =
            std::env::temp_dir().join(format!("label-preview-{}.png", std::process::id()));
        image
            .save(&path)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        debug!("preview written to {}", path.display());

        let status = Command::new(&options.viewer).arg(&path).status();
        let _ = std::fs::remove_file(&path);

        let status = status?;
        if !status.success() {
            debug!("viewer exited with {:?}", status.code());
        }
        Ok(())
    }
}
