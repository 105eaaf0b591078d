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

    tests/scp.rs

    End-to-end tests of loading and decoding synthetic SCP images.
*/
mod common;

use crate::common::*;
use fluxsync::{DecoderConfig, DriveSlots, FluxSyncError, PllMode, RevolutionBuffer};
use std::io::Cursor;

/// Ticks for 2000ns at 25ns per tick.
const CELL_TICKS: u16 = 80;

fn open_in_memory(drives: &mut DriveSlots, image: Vec<u8>, slot: usize) {
    drives
        .open_reader(Box::new(Cursor::new(image)), slot)
        .unwrap_or_else(|e| panic!("Failed to open image: {}", e));
}

#[test]
fn test_open_close_round_trip() {
    init();
    let image = build_scp_image(&scp_header(1, 0), &[TestTrack::new(0, vec![vec![160; 16]])]);
    let file = temp_image(&image, ".scp");

    let mut drives = DriveSlots::new();
    assert!(!drives.is_open(0));

    drives.open(file.path(), 0).unwrap();
    assert!(drives.is_open(0));
    assert_eq!(drives.drive(0).map(|d| d.revolutions()), Some(1));
    assert_eq!(drives.drive(0).and_then(|d| d.track()), None);

    drives.close(0);
    assert!(!drives.is_open(0));
    assert!(drives.drive(0).is_none());

    // Closing again is harmless.
    drives.close(0);
    assert!(!drives.is_open(0));
}

#[test]
fn test_open_rejects_extension() {
    init();
    let image = build_scp_image(&scp_header(1, 0), &[]);
    let file = temp_image(&image, ".img");

    let mut drives = DriveSlots::new();
    assert!(matches!(
        drives.open(file.path(), 0),
        Err(FluxSyncError::UnsupportedExtension)
    ));
    assert!(!drives.is_open(0));
}

#[test]
fn test_open_bare_scp_file_name() {
    init();
    let image = build_scp_image(&scp_header(1, 0), &[TestTrack::new(0, vec![vec![160; 16]])]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".scp");
    std::fs::write(&path, &image).unwrap();

    let mut drives = DriveSlots::new();
    drives.open(&path, 0).unwrap();
    assert!(drives.is_open(0));

    let upper = dir.path().join("DISK.SCP");
    std::fs::write(&upper, &image).unwrap();
    assert!(matches!(drives.open(&upper, 1), Err(FluxSyncError::UnsupportedExtension)));
}

#[test]
fn test_open_rejects_bad_headers() {
    init();
    let mut bad_sig = build_scp_image(&scp_header(1, 0), &[]);
    bad_sig[1] = b'X';

    let cases = [
        (bad_sig, "signature"),
        (build_scp_image(&scp_header(0, 0), &[]), "revolutions"),
        (build_scp_image(&scp_header(1, 8), &[]), "bit cell width"),
    ];

    let mut drives = DriveSlots::new();
    for (image, what) in cases {
        let file = temp_image(&image, ".scp");
        let result = drives.open(file.path(), 2);
        match what {
            "signature" => assert!(matches!(result, Err(FluxSyncError::InvalidSignature))),
            "revolutions" => assert!(matches!(result, Err(FluxSyncError::InvalidRevolutionCount(0)))),
            _ => assert!(matches!(result, Err(FluxSyncError::UnsupportedBitCellWidth(8)))),
        }
        assert!(!drives.is_open(2), "slot opened despite bad {}", what);
    }
}

#[test]
fn test_failed_open_keeps_previous_image() {
    init();
    let good = build_scp_image(&scp_header(2, 16), &[TestTrack::new(0, vec![vec![160; 8]; 2])]);
    let bad = build_scp_image(&scp_header(0, 0), &[]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, good, 1);
    assert!(drives.open_reader(Box::new(Cursor::new(bad)), 1).is_err());

    assert!(drives.is_open(1));
    assert_eq!(drives.drive(1).map(|d| d.revolutions()), Some(2));
}

#[test]
fn test_multi_revolution_flag() {
    init();
    let mut buffer = RevolutionBuffer::default();

    for revs in 1..=5u8 {
        let track = TestTrack::new(0, vec![vec![160; 32]; revs as usize]);
        let image = build_scp_image(&scp_header(revs, 0), &[track]);

        let mut drives = DriveSlots::new();
        open_in_memory(&mut drives, image, 0);
        let (bits, timings) = buffer.split_mut();
        let load = drives.load_track(0, 0, bits, timings).unwrap();

        assert_eq!(load.multi_revolution, revs != 1);
        assert_eq!(load.gap_offset, None);
        assert_eq!(load.bit_count, 64);
    }
}

#[test]
fn test_revolutions_clamped_to_maximum() {
    init();
    // Only the first five revolution records are read from an image claiming eight.
    let track = TestTrack::new(0, vec![vec![160; 4]; 8]);
    let image = build_scp_image(&scp_header(8, 0), &[track]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();
    drives.load_track(0, 0, bits, timings).unwrap();

    let store = drives.drive(0).unwrap().flux_store();
    assert_eq!(store.revolutions(), 5);
    assert_eq!(store.boundaries(), &[4, 8, 12, 16, 20]);
}

#[test]
fn test_alternating_cells() {
    init();
    // One flux transition every second bit cell.
    let track = TestTrack::new(0, vec![vec![2 * CELL_TICKS; 64]]);
    let image = build_scp_image(&scp_header(1, 0), &[track]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::with_bit_capacity(1024);
    let (bits, timings) = buffer.split_mut();
    let load = drives.load_track(0, 0, bits, timings).unwrap();

    assert_eq!(load.bit_count, 128);
    assert!(!load.multi_revolution);
    for (i, word) in buffer.bits[..8].iter().enumerate() {
        assert_eq!(*word, 0x5555, "word {}", i);
    }
    // 8 cells of 2000ns / 16
    for (i, timing) in buffer.timings[..16].iter().enumerate() {
        assert_eq!(*timing, 2000 * 8 / 16, "timing {}", i);
    }
}

#[test]
fn test_every_cell_a_transition() {
    init();
    let track = TestTrack::new(3, vec![vec![CELL_TICKS; 20]]);
    let image = build_scp_image(&scp_header(1, 0), &[track]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 3);
    let mut buffer = RevolutionBuffer::with_bit_capacity(1024);
    let (bits, timings) = buffer.split_mut();
    let load = drives.load_track(3, 3, bits, timings).unwrap();

    assert_eq!(load.bit_count, 20);
    assert_eq!(buffer.bits[0], 0xFFFF);
    assert_eq!(buffer.bits[1] & 0xF000, 0xF000);
    assert_eq!(buffer.timings[0], 1000);
    assert_eq!(buffer.timings[1], 1000);
    // The trailing group of 4 cells is divided by 2 * (1 + 4).
    assert_eq!(buffer.timings[2], (4 * 2000 / 10) as u16);
}

#[test]
fn test_custom_clock_centre() {
    init();
    let config = DecoderConfig::default().with_clock_centre(1000);
    let mut drives = DriveSlots::with_config(config).unwrap();

    // 2000ns spacing at a 1000ns clock alternates.
    let track = TestTrack::new(0, vec![vec![CELL_TICKS; 32]]);
    open_in_memory(&mut drives, build_scp_image(&scp_header(1, 0), &[track]), 0);

    let mut buffer = RevolutionBuffer::with_bit_capacity(256);
    let (bits, timings) = buffer.split_mut();
    let load = drives.load_track(0, 0, bits, timings).unwrap();

    assert_eq!(load.bit_count, 64);
    assert_eq!(buffer.bits[0], 0x5555);
    assert_eq!(buffer.timings[0], 500);
}

#[test]
fn test_revolution_replay_is_periodic() {
    init();
    let revolutions: Vec<Vec<u16>> = (0..3)
        .map(|seed| jittered_revolution(500, CELL_TICKS, seed))
        .collect();
    let image = build_scp_image(&scp_header(3, 0), &[TestTrack::new(12, revolutions)]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();

    let (bits, timings) = buffer.split_mut();
    let load = drives.load_track(0, 12, bits, timings).unwrap();
    assert!(load.multi_revolution);
    let first = revolution_hash(&buffer.bits, &buffer.timings, load.bit_count);

    // The first revolution is replayed once more, then the stored revolutions follow in order
    // and wrap back to the first.
    let mut hashes = Vec::new();
    for _ in 0..4 {
        let (bits, timings) = buffer.split_mut();
        let ct = drives.load_next_revolution(0, bits, timings).unwrap();
        assert!(ct > 1000);
        hashes.push(revolution_hash(&buffer.bits, &buffer.timings, ct));
    }

    assert_eq!(hashes[0], first);
    assert_ne!(hashes[1], first);
    assert_ne!(hashes[2], first);
    assert_ne!(hashes[1], hashes[2]);
    assert_eq!(hashes[3], first);
}

#[test]
fn test_fixed_clock_mode() {
    init();
    let revolutions = vec![jittered_revolution(300, CELL_TICKS, 7)];
    let image = build_scp_image(&scp_header(1, 0), &[TestTrack::new(0, revolutions)]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();
    drives.load_track(0, 0, bits, timings).unwrap();
    assert_eq!(drives.drive(0).unwrap().pll().mode(), PllMode::Authentic);

    drives.set_pll_mode(0, PllMode::FixedClock).unwrap();
    let (bits, timings) = buffer.split_mut();
    let ct = drives.load_next_revolution(0, bits, timings).unwrap();
    assert!(ct > 0);

    let pll = drives.drive(0).unwrap().pll();
    assert_eq!(pll.mode(), PllMode::FixedClock);
    assert_eq!(pll.clock(), pll.clock_centre());

    // Reloading restores the configured mode.
    let (bits, timings) = buffer.split_mut();
    drives.load_track(0, 0, bits, timings).unwrap();
    assert_eq!(drives.drive(0).unwrap().pll().mode(), PllMode::Authentic);
}

#[test]
fn test_missing_track_clears_state() {
    init();
    let image = build_scp_image(&scp_header(1, 0), &[TestTrack::new(0, vec![vec![160; 16]])]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();

    let (bits, timings) = buffer.split_mut();
    drives.load_track(0, 0, bits, timings).unwrap();
    assert_eq!(drives.drive(0).and_then(|d| d.track()), Some(0));

    let (bits, timings) = buffer.split_mut();
    assert!(matches!(
        drives.load_track(0, 1, bits, timings),
        Err(FluxSyncError::TrackNotPresent(1))
    ));

    let drive = drives.drive(0).unwrap();
    assert_eq!(drive.track(), None);
    assert!(drive.flux_store().is_empty());

    let (bits, timings) = buffer.split_mut();
    assert!(matches!(
        drives.load_next_revolution(0, bits, timings),
        Err(FluxSyncError::NoTrackLoaded(0))
    ));
}

#[test]
fn test_track_header_mismatch() {
    init();
    let mut track = TestTrack::new(2, vec![vec![160; 16]]);
    track.number = 5;
    let image = build_scp_image(&scp_header(1, 0), &[track]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();

    assert!(matches!(
        drives.load_track(0, 2, bits, timings),
        Err(FluxSyncError::TrackHeaderMismatch { expected: 2, found: 5 })
    ));
    assert!(drives.drive(0).unwrap().flux_store().is_empty());
}

#[test]
fn test_truncated_flux_data() {
    init();
    let mut image = build_scp_image(&scp_header(2, 0), &[TestTrack::new(0, vec![vec![160; 16]; 2])]);
    image.truncate(image.len() - 3);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();

    assert!(matches!(
        drives.load_track(0, 0, bits, timings),
        Err(FluxSyncError::ImageCorruptError(_))
    ));
    let drive = drives.drive(0).unwrap();
    assert!(drive.flux_store().is_empty());
    assert_eq!(drive.track(), None);
}

#[test]
fn test_empty_revolution_decodes_to_nothing() {
    init();
    let track = TestTrack::new(0, vec![vec![160; 8], vec![]]);
    let image = build_scp_image(&scp_header(2, 0), &[track]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();

    let (bits, timings) = buffer.split_mut();
    let load = drives.load_track(0, 0, bits, timings).unwrap();
    assert_eq!(load.bit_count, 16);
    assert!(load.multi_revolution);
    assert_eq!(drives.drive(0).unwrap().flux_store().boundaries(), &[8, 8]);

    // First revolution replayed, then the empty one, then back to the first.
    let mut counts = Vec::new();
    for _ in 0..3 {
        let (bits, timings) = buffer.split_mut();
        counts.push(drives.load_next_revolution(0, bits, timings).unwrap());
    }
    assert_eq!(counts, vec![16, 0, 16]);
}

#[test]
fn test_track_out_of_range() {
    init();
    let image = build_scp_image(&scp_header(1, 0), &[]);
    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();

    assert!(matches!(
        drives.load_track(0, 200, bits, timings),
        Err(FluxSyncError::TrackOutOfRange(200))
    ));
}

#[test]
fn test_track_offsets() {
    init();
    let tracks = [
        TestTrack::new(0, vec![vec![160; 4]]),
        TestTrack::new(1, vec![vec![160; 4]]),
        TestTrack::new(80, vec![vec![160; 4]]),
    ];
    let image = build_scp_image(&scp_header(1, 0), &tracks);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let offsets = drives.drive_mut(0).unwrap().track_offsets().unwrap();
    let present: Vec<usize> = offsets.iter().map(|(t, _)| *t).collect();
    assert_eq!(present, vec![0, 1, 80]);
}

#[cfg(feature = "flux")]
#[test]
fn test_revolution_histogram() {
    init();
    let revolutions = vec![jittered_revolution(2000, CELL_TICKS, 99)];
    let image = build_scp_image(&scp_header(1, 0), &[TestTrack::new(0, revolutions)]);

    let mut drives = DriveSlots::new();
    open_in_memory(&mut drives, image, 0);
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();
    drives.load_track(0, 0, bits, timings).unwrap();

    let mut histogram = drives.drive(0).unwrap().histogram(0).unwrap();
    assert_eq!(histogram.len(), 2000);
    let clock = histogram.suggested_clock_centre().unwrap();
    assert!((1700..=2300).contains(&clock), "suggested clock {}", clock);
}
