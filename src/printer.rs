//! Driver contract, registry and device transport.

use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::{
    bitmap::Bitmap,
    device::{DriverDescriptor, WidthMap},
    error::Error,
    locate,
    protocol::{self, Transaction},
    raster,
};

/// Options for one print transaction.
#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Tape width loaded in the printer, millimeters.
    pub width_mm: u32,
    /// Run-length compress raster rows where the protocol allows it.
    pub compress: bool,
    /// Poll the printer status frame where the protocol allows it.
    pub check_status: bool,
    /// Program used by the preview pseudo-driver.
    pub viewer: String,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            width_mm: 12,
            compress: false,
            check_status: false,
            viewer: "display".to_string(),
        }
    }
}

/// Uniform capability contract every device family implements.
///
/// A caller can enumerate, auto-detect and invoke any installed driver
/// through this trait without knowing its protocol details.
pub trait Driver: Sync {
    /// Registry key used for by-name selection.
    fn name(&self) -> &'static str;

    fn descriptor(&self) -> &DriverDescriptor;

    /// Non-blocking probe for an attached device.
    ///
    /// Never errors; any discovery failure reads as `false`. Cheap and
    /// side-effect free, so auto-detection can run it unconditionally.
    fn find(&self) -> bool;

    /// Map a tape width in millimeters to printable dots.
    fn mm_to_px(&self, mm: u32) -> Result<u32, Error> {
        self.descriptor().mm_to_px(mm)
    }

    /// Run one full print transaction.
    ///
    /// The transaction owns the device handle from open to close and the
    /// handle is released on every exit path. Partial sequences are not
    /// resumable; retrying means re-invoking the whole transaction.
    fn print(&self, bitmap: &Bitmap, options: &PrintOptions) -> Result<(), Error>;
}

// ---------------------------------------------------------------------------
// Brother PT-P300BT (Bluetooth rfcomm)

const PTOUCH_DEVICE: &str = "/dev/rfcomm0";

const PTOUCH_DESCRIPTOR: DriverDescriptor = DriverDescriptor {
    description: "Brother PT-P300BT",
    head_width_px: 64,
    // The protocol always carries 128 dots per line; the 64 dot head
    // sits in the middle.
    raster_px: 128,
    feed_start_px: 100,
    feed_min_length_px: 120,
    feed_end_px: 50,
    mirror_dots: true,
    widths: WidthMap::Table(&[(6, 32), (9, 48), (12, 64)]),
};

struct PtouchP300bt;

impl Driver for PtouchP300bt {
    fn name(&self) -> &'static str {
        "ptouch"
    }

    fn descriptor(&self) -> &DriverDescriptor {
        &PTOUCH_DESCRIPTOR
    }

    fn find(&self) -> bool {
        // Pairing happens out-of-band; a bound rfcomm node means paired.
        locate::fixed_device(Path::new(PTOUCH_DEVICE)).is_some()
    }

    fn print(&self, bitmap: &Bitmap, options: &PrintOptions) -> Result<(), Error> {
        self.mm_to_px(options.width_mm)?;
        let path =
            locate::fixed_device(Path::new(PTOUCH_DEVICE)).ok_or(Error::DeviceNotFound)?;

        let job = raster::rasterize(bitmap, self.descriptor());
        info!("printing {} raster rows to {}", job.len(), path.display());

        let mut dev = open_device(&path)?;
        protocol::run(
            &mut dev,
            protocol::PTOUCH_STEPS,
            &Transaction {
                job: &job,
                width_mm: options.width_mm as u8,
                compress: options.compress,
                check_status: options.check_status,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// DYMO LabelManager PnP (USB HID character device)

const DYMO_HID_ROOT: &str = "/sys/bus/hid/devices";
const DYMO_CHAR_ROOT: &str = "/dev/char";
// bus 0003 (USB), vendor 0922 (DYMO), product 1002 (LabelManager PnP)
const DYMO_HID_PREFIX: &str = "0003:0922:1002.";

const DYMO_DESCRIPTOR: DriverDescriptor = DriverDescriptor {
    description: "DYMO LabelManager PnP",
    head_width_px: 64,
    raster_px: 64,
    feed_start_px: 100,
    feed_min_length_px: 120,
    feed_end_px: 50,
    mirror_dots: false,
    widths: WidthMap::Linear { num: 16, den: 3 },
};

struct DymoLmPnp;

impl DymoLmPnp {
    fn device_path(&self) -> Option<PathBuf> {
        locate::hid_chardev(
            Path::new(DYMO_HID_ROOT),
            Path::new(DYMO_CHAR_ROOT),
            DYMO_HID_PREFIX,
        )
    }
}

impl Driver for DymoLmPnp {
    fn name(&self) -> &'static str {
        "dymo"
    }

    fn descriptor(&self) -> &DriverDescriptor {
        &DYMO_DESCRIPTOR
    }

    fn find(&self) -> bool {
        self.device_path().is_some()
    }

    fn print(&self, bitmap: &Bitmap, options: &PrintOptions) -> Result<(), Error> {
        self.mm_to_px(options.width_mm)?;
        let path = self.device_path().ok_or(Error::DeviceNotFound)?;

        let job = raster::rasterize(bitmap, self.descriptor());
        info!("printing {} raster rows to {}", job.len(), path.display());

        let mut dev = open_device(&path)?;
        // This family has no status or compression support.
        protocol::run(
            &mut dev,
            protocol::DYMO_STEPS,
            &Transaction {
                job: &job,
                width_mm: options.width_mm as u8,
                compress: false,
                check_status: false,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Registry

#[cfg(feature = "view")]
static DRIVERS: &[&dyn Driver] = &[&PtouchP300bt, &DymoLmPnp, &crate::view::View];
#[cfg(not(feature = "view"))]
static DRIVERS: &[&dyn Driver] = &[&PtouchP300bt, &DymoLmPnp];

/// All installed drivers, in detection order.
pub fn drivers() -> &'static [&'static dyn Driver] {
    DRIVERS
}

/// Look a driver up by its registry name.
pub fn by_name(name: &str) -> Option<&'static dyn Driver> {
    drivers().iter().copied().find(|d| d.name() == name)
}

/// First family whose probe succeeds, in registry order.
///
/// The preview pseudo-driver always probes false, so it is never picked
/// here; select it by name instead.
pub fn auto_detect() -> Option<&'static dyn Driver> {
    for driver in drivers() {
        debug!("probing {}", driver.name());
        if driver.find() {
            return Some(*driver);
        }
    }
    None
}

/// `(name, description)` of every attached printer, in registry order.
pub fn scan() -> Vec<(&'static str, &'static str)> {
    drivers()
        .iter()
        .filter(|d| d.find())
        .map(|d| (d.name(), d.descriptor().description))
        .collect()
}

/// Open the printer's character device for the duration of one
/// transaction. Closed on drop, whichever way the transaction ends.
fn open_device(path: &Path) -> Result<File, Error> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(file)
}
