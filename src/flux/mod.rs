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
*/

//! Flux handling: storage of raw flux samples, the PLL that resolves them into bit cells, and the
//! assembler that packs a revolution of bit cells into emulator-ready buffers.

pub mod flux_store;
#[cfg(feature = "flux")]
pub mod histogram;
pub mod pll;
pub mod revolution;

/// Duration of one SuperCard Pro sample tick in nanoseconds (40MHz sample clock).
pub const SCP_NS_PER_TICK: u64 = 25;
/// Ticks added for every zero (overflow) sample preceding a flux transition.
pub const SCP_OVERFLOW_TICKS: u64 = 0x10000;

/// The result of reading the next flux transition from a [FluxSource].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FluxRead {
    /// Time until the next flux transition, in nanoseconds.
    Interval(u64),
    /// The end of a revolution was reached. The source has already moved on to the next
    /// revolution.
    Index,
}

/// A source of flux transition intervals, consumed by the [pll::Pll].
pub trait FluxSource {
    fn next_flux(&mut self) -> FluxRead;
}

/// Replays a fixed list of intervals once, then reports an index on every call.
impl FluxSource for std::vec::IntoIter<u64> {
    fn next_flux(&mut self) -> FluxRead {
        match self.next() {
            Some(ns) => FluxRead::Interval(ns),
            None => FluxRead::Index,
        }
    }
}
