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

    src/file_parsers/scp.rs

    A parser for the SuperCardPro format.

    SCP format images encode raw flux information for each track of the disk.
    A 16-byte header is followed by a table of little-endian track offsets.
    Each track begins with a 'TRK' header and a list of revolution records,
    which locate the flux samples for each captured revolution. Flux samples
    themselves are big-endian 16-bit tick counts.

*/
use crate::{
    flux::flux_store::FluxStore,
    io::{get_length, Read, ReadSeek, Seek, SeekFrom},
    FluxSyncError,
    MAX_REVOLUTIONS,
};
use binrw::{binrw, BinRead, BinReaderExt};
use bitflags::bitflags;

pub const BASE_CAPTURE_RES: u32 = 25;
pub const SCP_TRACK_COUNT: usize = 168;
pub const MAX_TRACK_NUMBER: usize = SCP_TRACK_COUNT - 1;
pub const SCP_TRACK_TABLE_OFFSET: u64 = 0x10;

bitflags! {
    /// Flags stored in byte 8 of the SCP file header.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[rustfmt::skip]
    pub struct ScpFlags: u8 {
        const INDEX             = 0b0000_0001; // Flux data starts at the index pulse
        const TPI               = 0b0000_0010; // 96TPI drive
        const RPM               = 0b0000_0100; // 360RPM drive
        const TYPE              = 0b0000_1000; // Flux data has been normalized
        const READ_WRITE        = 0b0001_0000; // Image is read/write capable
        const FOOTER            = 0b0010_0000; // Extension footer is present
        const EXTENDED_MODE     = 0b0100_0000; // Extended mode, track table at 0x80
        const NON_SCP_CAPTURE   = 0b1000_0000; // Image was not created by SuperCardPro hardware
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScpDiskManufacturer {
    Cbm = 0x00,
    Atari = 0x10,
    Apple = 0x20,
    Pc = 0x30,
    Tandy = 0x40,
    TI = 0x50,
    Roland = 0x60,
    Amstrad = 0x70,
    Other = 0x80,
    TapeDrive = 0xE0,
    HardDrive = 0xF0,
}

impl ScpDiskManufacturer {
    pub fn from_type_byte(type_byte: u8) -> Option<Self> {
        let manufacturer = match type_byte & 0xF0 {
            0x00 => ScpDiskManufacturer::Cbm,
            0x10 => ScpDiskManufacturer::Atari,
            0x20 => ScpDiskManufacturer::Apple,
            0x30 => ScpDiskManufacturer::Pc,
            0x40 => ScpDiskManufacturer::Tandy,
            0x50 => ScpDiskManufacturer::TI,
            0x60 => ScpDiskManufacturer::Roland,
            0x70 => ScpDiskManufacturer::Amstrad,
            0x80 => ScpDiskManufacturer::Other,
            0xE0 => ScpDiskManufacturer::TapeDrive,
            0xF0 => ScpDiskManufacturer::HardDrive,
            _ => return None,
        };
        Some(manufacturer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[binrw]
#[brw(little)]
pub struct ScpFileHeader {
    pub id: [u8; 3],
    pub version: u8,
    pub disk_type: u8,
    pub revolutions: u8,
    pub start_track: u8,
    pub end_track: u8,
    pub flags: u8,
    pub bit_cell_width: u8,
    pub heads: u8,
    pub resolution: u8,
    pub checksum: u32,
}

#[derive(Debug)]
#[binrw]
#[brw(little)]
pub struct ScpTrackOffsetTable {
    pub track_offsets: [u32; SCP_TRACK_COUNT],
}

#[derive(Debug)]
#[binrw]
#[brw(little)]
pub struct ScpTrackHeader {
    pub id: [u8; 3],
    pub track_number: u8,
}

#[derive(Debug)]
#[binrw]
#[brw(little)]
pub struct ScpTrackRevolution {
    pub index_time: u32,
    pub length: u32,
    pub data_offset: u32,
}

/// A validated SCP file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpHeader {
    pub file_header: ScpFileHeader,
    /// The number of revolutions that will be loaded per track, clamped to [MAX_REVOLUTIONS].
    pub revolutions: usize,
    pub flags: ScpFlags,
}

impl ScpHeader {
    /// The major and minor version of the SCP software that wrote the image.
    pub fn version(&self) -> (u8, u8) {
        let major = self.file_header.version >> 4;
        let minor = self.file_header.version & 0x0F;
        (major, minor)
    }

    pub fn manufacturer(&self) -> Option<ScpDiskManufacturer> {
        ScpDiskManufacturer::from_type_byte(self.file_header.disk_type)
    }

    /// The number of revolutions stored in the image, before clamping.
    pub fn stored_revolutions(&self) -> u8 {
        self.file_header.revolutions
    }

    pub fn heads(&self) -> u8 {
        match self.file_header.heads {
            0 => 2,
            _ => 1,
        }
    }

    /// The sample resolution recorded in the header, in nanoseconds per tick.
    pub fn capture_resolution(&self) -> u32 {
        BASE_CAPTURE_RES + (self.file_header.resolution as u32 * BASE_CAPTURE_RES)
    }
}

pub struct ScpFormat {}

impl ScpFormat {
    pub fn extensions() -> Vec<&'static str> {
        vec!["scp"]
    }

    pub fn detect<RWS: ReadSeek>(mut image: RWS) -> bool {
        if image.seek(SeekFrom::Start(0)).is_err() {
            return false;
        }
        let header = if let Ok(header) = ScpFileHeader::read(&mut image) {
            header
        }
        else {
            return false;
        };

        header.id == "SCP".as_bytes()
    }

    /// Read and validate the SCP file header.
    pub fn read_header<RWS: ReadSeek>(image: &mut RWS) -> Result<ScpHeader, FluxSyncError> {
        image.seek(SeekFrom::Start(0))?;

        let header = ScpFileHeader::read(image)?;
        if header.id != "SCP".as_bytes() {
            log::error!("Expected SCP signature, got: {:02X?}", header.id);
            return Err(FluxSyncError::InvalidSignature);
        }
        log::trace!("Detected SCP file.");

        if header.revolutions == 0 {
            log::error!("SCP image has an invalid revolution count (0).");
            return Err(FluxSyncError::InvalidRevolutionCount(header.revolutions));
        }

        if header.bit_cell_width != 0 && header.bit_cell_width != 16 {
            log::error!("SCP image has unsupported bit cell width: {}", header.bit_cell_width);
            return Err(FluxSyncError::UnsupportedBitCellWidth(header.bit_cell_width));
        }

        let flags = ScpFlags::from_bits_retain(header.flags);
        log::trace!("SCP flags: {:?}", flags);

        if flags.contains(ScpFlags::EXTENDED_MODE) {
            log::warn!("Extended mode SCP image; the track table will be read from the standard location.");
        }

        let revolutions = (header.revolutions as usize).min(MAX_REVOLUTIONS);
        if revolutions < header.revolutions as usize {
            log::debug!(
                "Image contains {} revolutions per track, only the first {} will be used.",
                header.revolutions,
                revolutions
            );
        }

        let scp_header = ScpHeader {
            file_header: header,
            revolutions,
            flags,
        };

        let (major, minor) = scp_header.version();
        log::trace!("SCP version {}.{}", major, minor);
        log::trace!(
            "Disk type: {:02X} ({:?})",
            scp_header.file_header.disk_type,
            scp_header.manufacturer()
        );
        log::trace!(
            "Starting track: {} Ending track: {} Heads: {}",
            scp_header.file_header.start_track,
            scp_header.file_header.end_track,
            scp_header.heads()
        );

        if scp_header.file_header.resolution != 0 {
            log::warn!(
                "Capture resolution of {}ns recorded; flux will be decoded at {}ns per tick.",
                scp_header.capture_resolution(),
                BASE_CAPTURE_RES
            );
        }

        if scp_header.file_header.checksum == 0 {
            log::trace!("Image has CRC==0. Skipping CRC verification.");
        }
        else {
            log::trace!("Image CRC: {:08X} (not verified)", scp_header.file_header.checksum);
        }

        Ok(scp_header)
    }

    /// Read the track offset table, returning `(track, offset)` for each track present.
    pub fn read_track_offsets<RWS: ReadSeek>(image: &mut RWS) -> Result<Vec<(usize, u32)>, FluxSyncError> {
        image.seek(SeekFrom::Start(SCP_TRACK_TABLE_OFFSET))?;
        let table = ScpTrackOffsetTable::read(image)?;

        let offsets: Vec<(usize, u32)> = table
            .track_offsets
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, offset)| *offset > 0)
            .collect();

        log::trace!("Got {} track offsets.", offsets.len());
        Ok(offsets)
    }

    /// Load the flux samples of `revolutions` revolutions of `track` into a new [FluxStore].
    pub fn read_track<RWS: ReadSeek>(
        image: &mut RWS,
        revolutions: usize,
        track: u32,
    ) -> Result<FluxStore, FluxSyncError> {
        if track as usize > MAX_TRACK_NUMBER {
            log::error!("Track {} is beyond the end of the track table.", track);
            return Err(FluxSyncError::TrackOutOfRange(track));
        }

        let image_len = get_length(image)?;

        image.seek(SeekFrom::Start(SCP_TRACK_TABLE_OFFSET + track as u64 * 4))?;
        let track_offset: u32 = image.read_le()?;
        if track_offset == 0 {
            log::debug!("Track {} has no entry in the track table.", track);
            return Err(FluxSyncError::TrackNotPresent(track));
        }

        let track_offset = track_offset as u64;
        if track_offset + 4 > image_len {
            log::error!("Track {} offset {:08X} is beyond the end of the image.", track, track_offset);
            return Err(FluxSyncError::ImageCorruptError(format!(
                "track {} offset {:08X} out of range",
                track, track_offset
            )));
        }

        // Seek to the track header.
        image.seek(SeekFrom::Start(track_offset))?;

        // Read the track header.
        let track_header = ScpTrackHeader::read(image)?;
        log::trace!("Track number: {} offset: {:08X}", track_header.track_number, track_offset);

        // Verify header.
        if track_header.id != "TRK".as_bytes() {
            log::error!("Expected track header signature, got: {:02X?}", track_header.id);
            return Err(FluxSyncError::ImageCorruptError(format!(
                "bad track header signature for track {}",
                track
            )));
        }
        if track_header.track_number as u32 != track {
            log::error!(
                "Track header number {} does not match requested track {}",
                track_header.track_number,
                track
            );
            return Err(FluxSyncError::TrackHeaderMismatch {
                expected: track,
                found: track_header.track_number as u32,
            });
        }

        // Read in revolutions.
        let mut locations = Vec::with_capacity(revolutions);
        let mut total_samples = 0;
        for r in 0..revolutions {
            let revolution = ScpTrackRevolution::read(image)?;
            let data_start = track_offset + revolution.data_offset as u64;
            let data_end = data_start + revolution.length as u64 * 2;
            log::trace!(
                "Revolution {} index time: {:08} length: {:08} flux offset: {:08X}",
                r,
                revolution.index_time,
                revolution.length,
                data_start
            );

            if revolution.length == 0 {
                // Decodes as a revolution of zero bits.
                log::warn!("Revolution {} of track {} contains no flux samples.", r, track);
            }
            else if data_end > image_len {
                log::error!(
                    "Revolution {} of track {} extends beyond the end of the image ({:08X} > {:08X}).",
                    r,
                    track,
                    data_end,
                    image_len
                );
                return Err(FluxSyncError::ImageCorruptError(format!(
                    "revolution {} of track {} out of range",
                    r, track
                )));
            }

            total_samples += revolution.length as usize;
            locations.push((data_start, revolution.length as usize));
        }

        let mut samples = vec![0u16; total_samples];
        let mut boundaries = Vec::with_capacity(revolutions);
        let mut pos = 0;
        for (data_start, length) in locations {
            if length > 0 {
                image.seek(SeekFrom::Start(data_start))?;
                // Samples are kept in their on-disk byte order.
                image.read_exact(bytemuck::cast_slice_mut(&mut samples[pos..pos + length]))?;
                pos += length;
            }
            boundaries.push(pos);
        }

        log::debug!(
            "Loaded track {}: {} revolutions, {} flux samples.",
            track,
            boundaries.len(),
            total_samples
        );
        Ok(FluxStore::from_raw(samples, boundaries))
    }
}
