//! Label Tape Printer Drivers
//!
//! This crate converts a rendered monochrome label image into the exact
//! byte stream a thermal tape printer expects and writes it to the
//! printer's character device. Supported families: Brother PT-P300BT
//! (Bluetooth rfcomm) and DYMO LabelManager PnP (USB HID), plus a
//! preview pseudo-driver that opens the label in an image viewer.
//!
//! # Example
//!
//! ```rust,no_run
//! use tape_label::{auto_detect, Bitmap, PrintOptions};
//!
//! let bitmap = Bitmap::new(128, 64, vec![0xFF; 128 * 64 * 4]).unwrap();
//! let driver = auto_detect().expect("no printer attached");
//! driver.print(&bitmap, &PrintOptions::default()).unwrap();
//! ```

mod bitmap;
mod compress;
mod device;
mod error;
mod locate;
mod printer;
mod protocol;
mod raster;
#[cfg(feature = "view")]
mod view;

pub use crate::{
    bitmap::Bitmap,
    device::{DriverDescriptor, WidthMap},
    error::Error,
    printer::{auto_detect, by_name, drivers, scan, Driver, PrintOptions},
    raster::{rasterize, RasterJob},
};
