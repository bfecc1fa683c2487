//! Error types for label printer operations.
//!
//! Every error is terminal for the current print transaction; nothing is
//! retried internally. A partial transaction leaves the printer's own
//! state machine in an unknown position, so the only supported recovery
//! is re-running the full transaction from the buffer clear onwards.

use thiserror::Error;

/// Main error type for label printer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested tape width is not in the family's supported set.
    ///
    /// Families with a fixed width table (e.g. 6/9/12 mm cassettes)
    /// reject anything outside it before any device I/O happens.
    #[error("Unsupported tape width {0} mm")]
    UnsupportedWidth(u32),

    /// Discovery found no candidate device path.
    #[error("Printer device not found")]
    DeviceNotFound,

    /// Transport failure on the device character file.
    ///
    /// Wraps open/read/write errors. The device handle is always
    /// released before this reaches the caller.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The renderer handed over a malformed bitmap.
    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),
}
