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
use crate::args::*;
use bpaf::{construct, long, Parser};
use fluxsync::{config::MIN_CLOCK_CENTRE, PllMode};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) struct DumpParams {
    pub(crate) in_file: PathBuf,
    pub(crate) track: u32,
    pub(crate) revs: usize,
    pub(crate) pll_mode: Option<PllMode>,
    pub(crate) clock: Option<u32>,
    pub(crate) timings: bool,
    pub(crate) row_size: Option<u8>,
}

fn revs_parser() -> impl Parser<usize> {
    long("revs")
        .short('r')
        .argument::<usize>("REVS")
        .help("Number of revolutions to decode, including the one decoded on load")
        .fallback(1)
        .guard(|&revs| revs >= 1, "Must decode at least one revolution")
}

fn pll_mode_parser() -> impl Parser<PllMode> {
    long("pll-mode")
        .argument::<PllMode>("MODE")
        .help("PLL mode: fixed, variable or authentic")
}

fn clock_parser() -> impl Parser<u32> {
    long("clock")
        .argument::<u32>("NS")
        .help("Nominal bit cell clock in nanoseconds")
        .guard(|&clock| clock >= MIN_CLOCK_CENTRE, "Clock must be at least 10ns")
}

fn timings_parser() -> impl Parser<bool> {
    long("timings").help("Dump the per-byte timing values as well").switch()
}

fn row_size_parser() -> impl Parser<u8> {
    long("row-size")
        .argument::<u8>("WORDS")
        .help("Specify the number of words per row to be dumped")
        .guard(|&size| (4..=32).contains(&size), "Size must be between 4 and 32")
}

pub(crate) fn dump_parser() -> impl Parser<DumpParams> {
    let in_file = in_file_parser();
    let track = track_parser();
    let revs = revs_parser();
    let pll_mode = pll_mode_parser().optional();
    let clock = clock_parser().optional();
    let timings = timings_parser();
    let row_size = row_size_parser().optional();

    construct!(DumpParams {
        in_file,
        track,
        revs,
        pll_mode,
        clock,
        timings,
        row_size
    })
}
