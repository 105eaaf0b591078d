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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use binrw::BinWrite;
use fluxsync::file_parsers::scp::{
    ScpFileHeader,
    ScpTrackHeader,
    ScpTrackRevolution,
    SCP_TRACK_COUNT,
    SCP_TRACK_TABLE_OFFSET,
};
use hex::encode;
use sha1::{Digest, Sha1};
use std::io::{Cursor, Seek, SeekFrom, Write};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A track to be written into a synthetic SCP image.
pub struct TestTrack {
    /// Index into the track offset table.
    pub index: usize,
    /// Track number stored in the 'TRK' header. Normally equal to `index`.
    pub number: u8,
    /// Flux tick counts per revolution, in host order.
    pub revolutions: Vec<Vec<u16>>,
}

impl TestTrack {
    pub fn new(index: usize, revolutions: Vec<Vec<u16>>) -> Self {
        TestTrack {
            index,
            number: index as u8,
            revolutions,
        }
    }
}

pub fn scp_header(revolutions: u8, bit_cell_width: u8) -> ScpFileHeader {
    ScpFileHeader {
        id: *b"SCP",
        version: 0x22,
        disk_type: 0x30,
        revolutions,
        start_track: 0,
        end_track: 0,
        flags: 0x01,
        bit_cell_width,
        heads: 0,
        resolution: 0,
        checksum: 0,
    }
}

/// Build an SCP image in memory from a header and a list of tracks.
pub fn build_scp_image(header: &ScpFileHeader, tracks: &[TestTrack]) -> Vec<u8> {
    let mut image = Cursor::new(Vec::new());
    header.write(&mut image).unwrap();
    image
        .write_all(&vec![0u8; SCP_TRACK_COUNT * 4])
        .unwrap();

    for track in tracks {
        let track_offset = image.seek(SeekFrom::End(0)).unwrap();

        // Point the track table at this track.
        image
            .seek(SeekFrom::Start(SCP_TRACK_TABLE_OFFSET + track.index as u64 * 4))
            .unwrap();
        image.write_all(&(track_offset as u32).to_le_bytes()).unwrap();
        image.seek(SeekFrom::Start(track_offset)).unwrap();

        ScpTrackHeader {
            id: *b"TRK",
            track_number: track.number,
        }
        .write(&mut image)
        .unwrap();

        let mut data_offset = 4 + 12 * track.revolutions.len() as u32;
        for rev in &track.revolutions {
            ScpTrackRevolution {
                index_time: rev.iter().map(|t| *t as u32).sum(),
                length: rev.len() as u32,
                data_offset,
            }
            .write(&mut image)
            .unwrap();
            data_offset += rev.len() as u32 * 2;
        }

        for rev in &track.revolutions {
            for sample in rev {
                image.write_all(&sample.to_be_bytes()).unwrap();
            }
        }
    }

    image.into_inner()
}

/// Write `data` to a temporary file with the given suffix.
pub fn temp_image(data: &[u8], suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

/// Hash the populated portion of a decoded revolution's bit and timing buffers.
pub fn revolution_hash(bits: &[u16], timings: &[u16], bit_count: usize) -> String {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(bit_count as u32).to_le_bytes());
    for word in &bits[..bit_count.div_ceil(16)] {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    for timing in &timings[..bit_count.div_ceil(8)] {
        bytes.extend_from_slice(&timing.to_le_bytes());
    }
    compute_slice_hash(&bytes)
}

/// A revolution of flux with some jitter, made of MFM-like 2, 3 and 4 cell spacings at the
/// given cell time in ticks.
pub fn jittered_revolution(len: usize, cell_ticks: u16, seed: u64) -> Vec<u16> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let cells = rng.gen_range(2..=4u16);
            let jitter = rng.gen_range(0..=cell_ticks / 8);
            cells * cell_ticks + jitter - cell_ticks / 16
        })
        .collect()
}
