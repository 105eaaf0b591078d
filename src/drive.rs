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

    src/drive.rs

    Drive slots hold an open SCP image along with the flux data and PLL state
    of the currently loaded track. This is the interface a disk controller
    emulator drives: open an image, load tracks as the head moves, and pull
    further revolutions while the head stays put.
*/
use crate::{
    config::DecoderConfig,
    file_parsers::scp::{ScpFormat, ScpHeader},
    flux::{
        flux_store::FluxStore,
        pll::{Pll, PllMode},
        revolution::decode_revolution,
    },
    io::ReadSeek,
    FluxSyncError,
    DRIVE_SLOTS,
};
use std::{fs::File, io::BufReader, path::Path};

/// The result of loading a track.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TrackLoad {
    /// The number of bit cells decoded from the first revolution.
    pub bit_count: usize,
    /// True if the image stores more than one revolution per track.
    pub multi_revolution: bool,
    /// The bit offset of the track gap. SCP images do not record one, so this is always `None`.
    pub gap_offset: Option<u32>,
}

/// An open SCP image and the decode state of its currently loaded track.
pub struct Drive {
    image: Box<dyn ReadSeek>,
    header: ScpHeader,
    track: Option<u32>,
    store: FluxStore,
    pll: Pll,
}

impl Drive {
    fn new(image: Box<dyn ReadSeek>, header: ScpHeader, config: &DecoderConfig) -> Self {
        Drive {
            image,
            header,
            track: None,
            store: FluxStore::default(),
            pll: Pll::new(config.clock_centre, config.pll_mode),
        }
    }

    pub fn header(&self) -> &ScpHeader {
        &self.header
    }

    /// The number of revolutions loaded per track.
    pub fn revolutions(&self) -> usize {
        self.header.revolutions
    }

    /// The currently loaded track, if any.
    pub fn track(&self) -> Option<u32> {
        self.track
    }

    pub fn flux_store(&self) -> &FluxStore {
        &self.store
    }

    pub fn pll(&self) -> &Pll {
        &self.pll
    }

    /// List the tracks present in the image's track table.
    pub fn track_offsets(&mut self) -> Result<Vec<(usize, u32)>, FluxSyncError> {
        ScpFormat::read_track_offsets(&mut self.image)
    }

    /// Build a histogram of the flux intervals of revolution `rev` of the loaded track.
    #[cfg(feature = "flux")]
    pub fn histogram(&self, rev: usize) -> Option<crate::flux::histogram::FluxHistogram> {
        self.store
            .intervals(rev)
            .map(|intervals| crate::flux::histogram::FluxHistogram::new(&intervals))
    }

    fn load_track(
        &mut self,
        config: &DecoderConfig,
        track: u32,
        bits: &mut [u16],
        timings: &mut [u16],
    ) -> Result<TrackLoad, FluxSyncError> {
        // Release the previous track before reading so a failed load leaves nothing behind.
        self.track = None;
        self.store = FluxStore::default();

        self.store = ScpFormat::read_track(&mut self.image, self.header.revolutions, track)?;
        self.track = Some(track);
        self.pll = Pll::new(config.clock_centre, config.pll_mode);

        let bit_count = decode_revolution(&mut self.pll, &mut self.store, bits, timings);
        Ok(TrackLoad {
            bit_count,
            multi_revolution: self.header.revolutions != 1,
            gap_offset: None,
        })
    }

    fn load_next_revolution(&mut self, bits: &mut [u16], timings: &mut [u16]) -> usize {
        decode_revolution(&mut self.pll, &mut self.store, bits, timings)
    }
}

/// A fixed set of drive slots. All decoding goes through this context; a slot is only ever
/// mutated through `&mut self`, so callers sharing a context between threads must provide their
/// own synchronization.
pub struct DriveSlots {
    config: DecoderConfig,
    drives: [Option<Drive>; DRIVE_SLOTS],
}

impl Default for DriveSlots {
    fn default() -> Self {
        DriveSlots::new()
    }
}

impl DriveSlots {
    pub fn new() -> Self {
        DriveSlots {
            config: DecoderConfig::default(),
            drives: Default::default(),
        }
    }

    pub fn with_config(config: DecoderConfig) -> Result<Self, FluxSyncError> {
        config.validate()?;
        Ok(DriveSlots {
            config,
            drives: Default::default(),
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Open the SCP image at `path` in drive slot `slot`.
    ///
    /// The file name must end in `.scp` (a file named just `.scp` qualifies) and the image must
    /// have a valid header. On failure the slot is left as it was; on success any image previously
    /// open in the slot is closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, slot: usize) -> Result<(), FluxSyncError> {
        let path = path.as_ref();
        Self::check_slot(slot)?;

        let has_scp_suffix = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".scp"));
        if !has_scp_suffix {
            log::debug!("DriveSlots::open(): {} is not an .scp file", path.display());
            return Err(FluxSyncError::UnsupportedExtension);
        }

        let file = File::open(path)?;
        self.open_reader(Box::new(BufReader::new(file)), slot)?;
        log::debug!("DriveSlots::open(): opened {} in slot {}", path.display(), slot);
        Ok(())
    }

    /// Open an SCP image from any readable, seekable source in drive slot `slot`. No file
    /// extension check is performed.
    pub fn open_reader(&mut self, mut image: Box<dyn ReadSeek>, slot: usize) -> Result<(), FluxSyncError> {
        Self::check_slot(slot)?;

        let header = ScpFormat::read_header(&mut image)?;
        self.drives[slot] = Some(Drive::new(image, header, &self.config));
        Ok(())
    }

    /// Close the image in drive slot `slot`, releasing its file handle and flux data. Closing an
    /// empty or invalid slot does nothing.
    pub fn close(&mut self, slot: usize) {
        if let Some(drive) = self.drives.get_mut(slot) {
            if drive.take().is_some() {
                log::debug!("DriveSlots::close(): closed slot {}", slot);
            }
        }
    }

    pub fn is_open(&self, slot: usize) -> bool {
        matches!(self.drives.get(slot), Some(Some(_)))
    }

    pub fn drive(&self, slot: usize) -> Option<&Drive> {
        self.drives.get(slot).and_then(|d| d.as_ref())
    }

    pub fn drive_mut(&mut self, slot: usize) -> Result<&mut Drive, FluxSyncError> {
        Self::check_slot(slot)?;
        self.drives[slot].as_mut().ok_or(FluxSyncError::DriveNotOpen(slot))
    }

    /// Override the PLL mode of the track loaded in `slot`. Loading a new track restores the
    /// configured mode.
    pub fn set_pll_mode(&mut self, slot: usize, mode: PllMode) -> Result<(), FluxSyncError> {
        let drive = self.drive_mut(slot)?;
        log::debug!("DriveSlots::set_pll_mode(): slot {} mode: {}", slot, mode);
        drive.pll.set_mode(mode);
        Ok(())
    }

    /// Load `track` from the image in `slot`, reading every stored revolution, and decode the
    /// first revolution into `bits` and `timings`.
    ///
    /// If the load fails the slot is left with no track loaded.
    pub fn load_track(
        &mut self,
        slot: usize,
        track: u32,
        bits: &mut [u16],
        timings: &mut [u16],
    ) -> Result<TrackLoad, FluxSyncError> {
        let config = self.config;
        let drive = self.drive_mut(slot)?;
        let load = drive.load_track(&config, track, bits, timings)?;
        log::debug!(
            "DriveSlots::load_track(): slot {} track {} decoded {} bits",
            slot,
            track,
            load.bit_count
        );
        Ok(load)
    }

    /// Decode the next revolution of the track loaded in `slot` from flux data already in memory.
    pub fn load_next_revolution(
        &mut self,
        slot: usize,
        bits: &mut [u16],
        timings: &mut [u16],
    ) -> Result<usize, FluxSyncError> {
        let drive = self.drive_mut(slot)?;
        if drive.track.is_none() {
            return Err(FluxSyncError::NoTrackLoaded(slot));
        }
        Ok(drive.load_next_revolution(bits, timings))
    }

    fn check_slot(slot: usize) -> Result<(), FluxSyncError> {
        if slot >= DRIVE_SLOTS {
            log::error!("Invalid drive slot: {}", slot);
            return Err(FluxSyncError::InvalidDriveSlot(slot));
        }
        Ok(())
    }
}
