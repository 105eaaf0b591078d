/*
    fluxsync
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/lib.rs

    fluxsync reads SuperCard Pro (SCP) flux images and reconstructs the bit
    cells a floppy disk controller would see when reading each track, along
    with coarse timing information for every group of eight bits. The output
    is intended to be handed directly to a disk controller emulator.
*/

//! # fluxsync
//!
//! The entry point is [DriveSlots], a small fixed set of emulated drives. Each slot may have one
//! SCP image open at a time. Loading a track reads every stored revolution of that track into
//! memory and decodes the first revolution through a software PLL. Subsequent revolutions are
//! decoded from the same flux data with [DriveSlots::load_next_revolution].
//!
//! ```no_run
//! use fluxsync::{DriveSlots, RevolutionBuffer};
//!
//! let mut drives = DriveSlots::new();
//! drives.open("disk.scp", 0).unwrap();
//!
//! let mut buffer = RevolutionBuffer::default();
//! let (bits, timings) = buffer.split_mut();
//! let load = drives.load_track(0, 0, bits, timings).unwrap();
//! println!("decoded {} bits", load.bit_count);
//!
//! drives.close(0);
//! ```

pub mod config;
pub mod drive;
pub mod file_parsers;
pub mod flux;
pub mod io;

use thiserror::Error;

/// The number of emulated drive slots available in a [DriveSlots] context.
pub const DRIVE_SLOTS: usize = 4;
/// The maximum number of revolutions kept per track. Images storing more are clamped.
pub const MAX_REVOLUTIONS: usize = 5;

#[derive(Debug, Error)]
pub enum FluxSyncError {
    #[error("An IO error occurred reading the flux image: {0}")]
    IoError(#[from] std::io::Error),
    #[error("The file does not have an .scp extension")]
    UnsupportedExtension,
    #[error("The image does not have a valid SCP signature")]
    InvalidSignature,
    #[error("The image has an invalid revolution count: {0}")]
    InvalidRevolutionCount(u8),
    #[error("The image has an unsupported bit cell width: {0}")]
    UnsupportedBitCellWidth(u8),
    #[error("The image parser encountered an error: {0}")]
    FormatParseError(String),
    #[error("The image parser determined the image was corrupt: {0}")]
    ImageCorruptError(String),
    #[error("Track {0} is outside the range of the track directory")]
    TrackOutOfRange(u32),
    #[error("Track {0} is not present in the image")]
    TrackNotPresent(u32),
    #[error("Track header mismatch: expected track {expected}, found {found}")]
    TrackHeaderMismatch { expected: u32, found: u32 },
    #[error("Invalid drive slot: {0}")]
    InvalidDriveSlot(usize),
    #[error("No image is open in drive slot {0}")]
    DriveNotOpen(usize),
    #[error("No track is loaded in drive slot {0}")]
    NoTrackLoaded(usize),
    #[error("Invalid parameters were specified to a library function")]
    ParameterError,
}

impl From<binrw::Error> for FluxSyncError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => FluxSyncError::IoError(e),
            binrw::Error::Backtrace(bt) => FluxSyncError::from(*bt.error),
            e => FluxSyncError::FormatParseError(e.to_string()),
        }
    }
}

pub use crate::{
    config::DecoderConfig,
    drive::{Drive, DriveSlots, TrackLoad},
    file_parsers::{
        scp::{ScpFlags, ScpFormat, ScpHeader},
        supported_extensions,
    },
    flux::{
        flux_store::FluxStore,
        pll::{Pll, PllBit, PllMode},
        revolution::{decode_revolution, RevolutionBuffer},
        FluxRead,
        FluxSource,
    },
};

#[cfg(feature = "flux")]
pub use crate::flux::histogram::FluxHistogram;
