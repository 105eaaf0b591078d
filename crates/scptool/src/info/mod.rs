/*
    scptool
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
*/
use crate::args::GlobalOptions;
use anyhow::{Context, Error};
use fluxsync::{DriveSlots, RevolutionBuffer};

pub mod args;

pub(crate) fn run(global: &GlobalOptions, params: &args::InfoParams) -> Result<(), Error> {
    let mut drives = DriveSlots::new();
    drives
        .open(&params.in_file, 0)
        .with_context(|| format!("Error opening image {}", params.in_file.display()))?;

    let drive = drives.drive_mut(0)?;
    let header = drive.header().clone();
    let (major, minor) = header.version();

    println!("SCP image info:");
    println!("{}", "-".repeat(79));
    println!("Version: {}.{}", major, minor);
    match header.manufacturer() {
        Some(manufacturer) => println!("Disk type: {:02X} ({:?})", header.file_header.disk_type, manufacturer),
        None => println!("Disk type: {:02X} (unknown)", header.file_header.disk_type),
    }
    println!(
        "Revolutions: {} stored, {} used",
        header.stored_revolutions(),
        header.revolutions
    );
    println!(
        "Tracks: {}-{} Heads: {}",
        header.file_header.start_track,
        header.file_header.end_track,
        header.heads()
    );
    println!("Capture resolution: {}ns", header.capture_resolution());
    println!("Flags: {:?}", header.flags);
    println!();

    let offsets = drive.track_offsets()?;
    println!("{} tracks present:", offsets.len());
    if !global.silent {
        for (track, offset) in &offsets {
            println!("  Track {:3}: offset {:08X}", track, offset);
        }
    }

    if let Some(track) = params.track {
        println!();
        track_info(&mut drives, track)?;
    }

    Ok(())
}

fn track_info(drives: &mut DriveSlots, track: u32) -> Result<(), Error> {
    let mut buffer = RevolutionBuffer::default();
    let (bits, timings) = buffer.split_mut();
    let load = drives
        .load_track(0, track, bits, timings)
        .with_context(|| format!("Error loading track {}", track))?;

    let drive = drives.drive_mut(0)?;
    let store = drive.flux_store();
    println!("Track {}: {} revolutions, {} flux samples", track, store.revolutions(), store.len());
    println!("First revolution decoded to {} bits", load.bit_count);

    for rev in 0..store.revolutions() {
        let mut histogram = match drive.histogram(rev) {
            Some(histogram) => histogram,
            None => continue,
        };
        let total_ms = histogram.total_time() as f64 / 1_000_000.0;
        match histogram.suggested_clock_centre() {
            Some(clock) => println!(
                "  Revolution {}: {} transitions, {:.3}ms, suggested clock {}ns",
                rev,
                histogram.len(),
                total_ms,
                clock
            ),
            None => println!(
                "  Revolution {}: {} transitions, {:.3}ms",
                rev,
                histogram.len(),
                total_ms
            ),
        }
    }

    Ok(())
}
