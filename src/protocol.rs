//! Per-family command grammars and the shared transaction executor.
//!
//! A family's whole print transaction is an ordered list of [`Step`]s
//! consumed front to back by [`run`]. Keeping the grammar as data keeps
//! the state sequencing in one place instead of one hand-rolled writer
//! loop per family.

use log::debug;
use std::io::{Read, Write};

use crate::{compress, error::Error, raster::RasterJob};

/// One phase of the print transaction.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// Fixed command bytes.
    Raw(&'static [u8]),
    /// Zero padding flushing stale printer state before the reset.
    ZeroFill(usize),
    /// Request and read back a 32 byte status frame, when enabled.
    StatusCheck,
    /// Media, quality and total row count declaration.
    MediaQuality,
    /// Compression mode select; must match what the data phase emits.
    Compression,
    /// Bytes-per-line declaration used by the simpler families.
    BytesPerLine,
    /// The raster rows themselves.
    Data(DataFraming),
    /// Trailer byte triggering the physical cut and eject.
    Eject(u8),
}

/// How one raster row is framed on the wire.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DataFraming {
    /// `cmd <len lo> <len hi> <payload>`, little-endian length. With
    /// compression active the payload is run-length coded and an
    /// all-zero row shrinks to the single `blank` byte.
    LengthPrefixed { cmd: u8, blank: u8 },
    /// One framing byte then the raw row, no length field.
    Framed(u8),
}

/// Job state one transaction runs against.
pub(crate) struct Transaction<'a> {
    pub job: &'a RasterJob,
    /// Tape width in millimeters, already validated by the driver.
    pub width_mm: u8,
    pub compress: bool,
    pub check_status: bool,
}

/// Brother PT-P300BT raster grammar.
///
/// The head prints 64 dots centered in a 128 dot protocol raster; the
/// raster converter already accounts for the bias.
pub(crate) const PTOUCH_STEPS: &[Step] = &[
    Step::ZeroFill(64),
    Step::Raw(&[0x1B, 0x40]),             // ESC @ : clear print buffer
    Step::Raw(&[0x1B, 0x69, 0x61, 0x01]), // ESC i a : enter raster mode
    Step::StatusCheck,
    Step::MediaQuality,
    Step::Raw(&[0x1B, 0x69, 0x4B, 0x08]), // ESC i K : full cut
    Step::Raw(&[0x1B, 0x69, 0x4D, 0x00]), // ESC i M : default feed, no mirror
    Step::Raw(&[0x1B, 0x69, 0x64, 0x00, 0x00]), // ESC i d : zero margin
    Step::Compression,
    Step::Data(DataFraming::LengthPrefixed {
        cmd: 0x47,
        blank: 0x5A,
    }),
    Step::Eject(0x1A), // SUB : print then eject
];

/// DYMO LabelManager PnP grammar: three declarations, then one SYN
/// framed row per line. No status, no compression, no trailer.
pub(crate) const DYMO_STEPS: &[Step] = &[
    Step::Raw(&[0x1B, 0x43, 0x00]), // ESC C : tape color
    Step::Raw(&[0x1B, 0x42, 0x00]), // ESC B : bias text height
    Step::BytesPerLine,             // ESC D n
    Step::Data(DataFraming::Framed(0x16)),
];

const STATUS_REQUEST: &[u8] = &[0x1B, 0x69, 0x53]; // ESC i S

/// Walk a grammar once against an open device.
///
/// The device is any bidirectional byte channel; the caller owns it and
/// releases it whether or not this returns an error.
pub(crate) fn run<D: Read + Write>(
    dev: &mut D,
    steps: &[Step],
    tx: &Transaction<'_>,
) -> Result<(), Error> {
    let mut first_status = true;

    for step in steps {
        match *step {
            Step::Raw(bytes) => dev.write_all(bytes)?,
            Step::ZeroFill(count) => dev.write_all(&vec![0u8; count])?,
            Step::StatusCheck => {
                if tx.check_status {
                    status_check(dev, first_status)?;
                    first_status = false;
                }
            }
            Step::MediaQuality => dev.write_all(&media_quality(tx))?,
            Step::Compression => {
                let mode: &[u8] = if tx.compress {
                    &[0x4D, 0x02]
                } else {
                    &[0x4D, 0x00]
                };
                dev.write_all(mode)?;
            }
            Step::BytesPerLine => dev.write_all(&[0x1B, 0x44, tx.job.row_bytes() as u8])?,
            Step::Data(framing) => write_rows(dev, framing, tx)?,
            Step::Eject(byte) => dev.write_all(&[byte])?,
        }
    }

    Ok(())
}

/// ESC i z : print quality, media type, tape width in mm, label height
/// (0 for continuous tape) and the post-padding row count, little-endian.
fn media_quality(tx: &Transaction<'_>) -> Vec<u8> {
    let [lo, hi] = (tx.job.len() as u16).to_le_bytes();
    vec![
        0x1B, 0x69, 0x7A, 0xC4, 0x01, tx.width_mm, 0x00, lo, hi, 0x00, 0x00, 0x00, 0x00,
    ]
}

fn write_rows<D: Write>(dev: &mut D, framing: DataFraming, tx: &Transaction<'_>) -> Result<(), Error> {
    for row in tx.job.rows() {
        match framing {
            DataFraming::LengthPrefixed { cmd, blank } => {
                if tx.compress && compress::is_blank(row) {
                    dev.write_all(&[blank])?;
                } else if tx.compress {
                    let packed = compress::pack_bits(row);
                    let [lo, hi] = (packed.len() as u16).to_le_bytes();
                    dev.write_all(&[cmd, lo, hi])?;
                    dev.write_all(&packed)?;
                } else {
                    let [lo, hi] = (row.len() as u16).to_le_bytes();
                    dev.write_all(&[cmd, lo, hi])?;
                    dev.write_all(row)?;
                }
            }
            DataFraming::Framed(byte) => {
                dev.write_all(&[byte])?;
                dev.write_all(row)?;
            }
        }
    }

    Ok(())
}

/// Send a status request and read the fixed 32 byte response.
///
/// On the first check of a transaction a stale response from an aborted
/// run may still be queued; one drain read is attempted first and a
/// short (or empty) result there is expected and ignored.
fn status_check<D: Read + Write>(dev: &mut D, drain: bool) -> Result<(), Error> {
    if drain {
        let mut stale = [0u8; 32];
        let drained = dev.read(&mut stale).unwrap_or(0);
        debug!("drained {} stale status bytes", drained);
    }

    dev.write_all(STATUS_REQUEST)?;

    let mut frame = [0u8; 32];
    dev.read_exact(&mut frame)?;
    debug!("status frame: {:X?}", &frame[..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::device::{DriverDescriptor, WidthMap};
    use crate::raster::rasterize;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::io;

    const DESC: DriverDescriptor = DriverDescriptor {
        description: "test",
        head_width_px: 64,
        raster_px: 128,
        feed_start_px: 100,
        feed_min_length_px: 120,
        feed_end_px: 50,
        mirror_dots: true,
        widths: WidthMap::Table(&[(6, 32), (9, 48), (12, 64)]),
    };

    /// In-memory device: scripted reads, captured writes.
    struct StubDevice {
        reads: VecDeque<Vec<u8>>,
        written: Vec<u8>,
    }

    impl StubDevice {
        fn new(reads: Vec<Vec<u8>>) -> Self {
            StubDevice {
                reads: reads.into_iter().collect(),
                written: Vec::new(),
            }
        }
    }

    impl io::Read for StubDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }

    impl io::Write for StubDevice {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn blank_job(columns: u32) -> crate::raster::RasterJob {
        let bitmap =
            Bitmap::new(columns, 64, vec![0xFF; (columns * 64 * 4) as usize]).unwrap();
        rasterize(&bitmap, &DESC)
    }

    fn transaction(job: &crate::raster::RasterJob, compress: bool) -> Transaction<'_> {
        Transaction {
            job,
            width_mm: 12,
            compress,
            check_status: false,
        }
    }

    #[test]
    fn ptouch_stream_is_bit_exact() {
        let job = blank_job(3);
        let mut dev = StubDevice::new(Vec::new());
        run(&mut dev, PTOUCH_STEPS, &transaction(&job, false)).unwrap();

        let mut expected = vec![0u8; 64];
        expected.extend_from_slice(&[0x1B, 0x40]);
        expected.extend_from_slice(&[0x1B, 0x69, 0x61, 0x01]);
        // 53 rows = 3 columns + 50 feed rows, little-endian.
        expected.extend_from_slice(&[
            0x1B, 0x69, 0x7A, 0xC4, 0x01, 0x0C, 0x00, 53, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        expected.extend_from_slice(&[0x1B, 0x69, 0x4B, 0x08]);
        expected.extend_from_slice(&[0x1B, 0x69, 0x4D, 0x00]);
        expected.extend_from_slice(&[0x1B, 0x69, 0x64, 0x00, 0x00]);
        expected.extend_from_slice(&[0x4D, 0x00]);
        for _ in 0..53 {
            expected.extend_from_slice(&[0x47, 16, 0x00]);
            expected.extend_from_slice(&[0u8; 16]);
        }
        expected.push(0x1A);

        assert_eq!(dev.written, expected);
    }

    #[test]
    fn row_count_includes_feed_padding() {
        let job = blank_job(3);
        let frame = media_quality(&transaction(&job, false));
        assert_eq!(&frame[7..9], &[53, 0]);
    }

    #[test]
    fn blank_rows_use_shortcut_when_compressed() {
        let job = blank_job(1);
        let mut dev = StubDevice::new(Vec::new());
        run(&mut dev, PTOUCH_STEPS, &transaction(&job, true)).unwrap();

        // Compression mode announced, then every all-zero row is a
        // single Z instead of a G frame.
        assert!(dev
            .written
            .windows(2)
            .any(|pair| pair == &[0x4D, 0x02][..]));
        assert_eq!(dev.written.iter().filter(|&&b| b == 0x5A).count(), 51);
        assert!(!dev.written.contains(&0x47));
    }

    #[test]
    fn inked_rows_are_packed_when_compressed() {
        let mut pixels = vec![0xFF; 64 * 4];
        pixels[0] = 0x00;
        let bitmap = Bitmap::new(1, 64, pixels).unwrap();
        let job = rasterize(&bitmap, &DESC);

        let mut dev = StubDevice::new(Vec::new());
        run(&mut dev, PTOUCH_STEPS, &transaction(&job, true)).unwrap();

        // One G frame for the inked column, 50 blanks for the feed.
        let g = dev.written.iter().position(|&b| b == 0x47).unwrap();
        let len = u16::from_le_bytes([dev.written[g + 1], dev.written[g + 2]]) as usize;
        assert!(len < 16, "packed payload should beat the raw 16 bytes");
        assert_eq!(dev.written.iter().filter(|&&b| b == 0x5A).count(), 50);
    }

    #[test]
    fn dymo_rows_have_no_length_prefix() {
        let bitmap = Bitmap::new(2, 64, vec![0xFF; 2 * 64 * 4]).unwrap();
        let desc = DriverDescriptor {
            raster_px: 64,
            mirror_dots: false,
            feed_end_px: 1,
            widths: WidthMap::Linear { num: 16, den: 3 },
            ..DESC
        };
        let job = rasterize(&bitmap, &desc);

        let mut dev = StubDevice::new(Vec::new());
        run(&mut dev, DYMO_STEPS, &transaction(&job, false)).unwrap();

        let mut expected = vec![0x1B, 0x43, 0x00, 0x1B, 0x42, 0x00, 0x1B, 0x44, 8];
        for _ in 0..3 {
            expected.push(0x16);
            expected.extend_from_slice(&[0u8; 8]);
        }
        assert_eq!(dev.written, expected);
    }

    #[test]
    fn status_drain_tolerates_short_read() {
        let job = blank_job(1);
        // 5 stale bytes queued, then a proper 32 byte frame.
        let mut dev = StubDevice::new(vec![vec![0xEE; 5], vec![0x80; 32]]);
        let tx = Transaction {
            job: &job,
            width_mm: 12,
            compress: false,
            check_status: true,
        };
        run(&mut dev, PTOUCH_STEPS, &tx).unwrap();

        // The real request went out after the drain.
        assert!(dev
            .written
            .windows(3)
            .any(|w| w == &[0x1B, 0x69, 0x53][..]));
    }

    #[test]
    fn missing_status_frame_is_an_io_error() {
        let job = blank_job(1);
        let mut dev = StubDevice::new(Vec::new());
        let tx = Transaction {
            job: &job,
            width_mm: 12,
            compress: false,
            check_status: true,
        };

        match run(&mut dev, PTOUCH_STEPS, &tx) {
            Err(Error::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    /// Writer that fails once its byte budget is exhausted and counts
    /// how many times it is released.
    struct FlakyDevice<'a> {
        budget: usize,
        closes: &'a Cell<u32>,
    }

    impl io::Read for FlakyDevice<'_> {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl io::Write for FlakyDevice<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.budget {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "head gone"));
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for FlakyDevice<'_> {
        fn drop(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    #[test]
    fn write_failure_mid_data_releases_device_once() {
        let job = blank_job(3);
        let closes = Cell::new(0);

        {
            // Enough budget for the preamble plus a few data frames.
            let mut dev = FlakyDevice {
                budget: 200,
                closes: &closes,
            };
            match run(&mut dev, PTOUCH_STEPS, &transaction(&job, false)) {
                Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
                other => panic!("expected Io error, got {:?}", other),
            }
        }

        assert_eq!(closes.get(), 1);
    }
}
