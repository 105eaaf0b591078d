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
pub(crate) mod args;

use anyhow::{Context, Error};
use std::io::{BufWriter, Write};

use crate::args::GlobalOptions;
use fluxsync::{DecoderConfig, DriveSlots, RevolutionBuffer};

pub(crate) fn run(global: &GlobalOptions, params: &args::DumpParams) -> Result<(), Error> {
    let row_size = params.row_size.unwrap_or(8) as usize;

    let mut config = DecoderConfig::default();
    if let Some(clock) = params.clock {
        config = config.with_clock_centre(clock);
    }
    if let Some(mode) = params.pll_mode {
        config = config.with_pll_mode(mode);
    }

    let mut drives = DriveSlots::with_config(config)?;
    drives
        .open(&params.in_file, 0)
        .with_context(|| format!("Error opening image {}", params.in_file.display()))?;

    let mut buffer = RevolutionBuffer::default();
    let mut buf = BufWriter::new(std::io::stdout());

    let (bits, timings) = buffer.split_mut();
    let load = drives
        .load_track(0, params.track, bits, timings)
        .with_context(|| format!("Error loading track {}", params.track))?;

    if !global.silent {
        println!(
            "Track {} ({} clock, {} PLL), multi-revolution: {}",
            params.track,
            config.clock_centre,
            config.pll_mode,
            load.multi_revolution
        );
    }

    let mut bit_count = load.bit_count;
    for rev in 0..params.revs {
        if rev > 0 {
            let (bits, timings) = buffer.split_mut();
            bit_count = drives.load_next_revolution(0, bits, timings)?;
        }

        _ = writeln!(&mut buf, "Revolution {}: {} bits", rev, bit_count);
        dump_words(&buffer.bits[..bit_count.div_ceil(16)], row_size, &mut buf)?;

        if params.timings {
            _ = writeln!(&mut buf, "Timings:");
            dump_words(&buffer.timings[..bit_count.div_ceil(8)], row_size, &mut buf)?;
        }
    }

    buf.flush()?;
    Ok(())
}

fn dump_words<W: Write>(words: &[u16], row_size: usize, out: &mut W) -> Result<(), Error> {
    for (row, chunk) in words.chunks(row_size).enumerate() {
        write!(out, "{:05X} |", row * row_size)?;
        for word in chunk {
            write!(out, " {:04X}", word)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
