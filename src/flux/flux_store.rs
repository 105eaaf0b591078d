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

    src/flux/flux_store.rs

    In-memory flux samples for all stored revolutions of a single track.

    Samples are kept exactly as they appear in the image: 16-bit big-endian
    tick counts. They are converted to host order only as they are read.
*/
use crate::flux::{FluxRead, FluxSource, SCP_NS_PER_TICK, SCP_OVERFLOW_TICKS};

/// Flux samples for every stored revolution of one track, plus the read cursor used to replay
/// them.
///
/// Revolutions are stored back to back in a single buffer. `boundaries[n]` holds the index one
/// past the last sample of revolution `n`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FluxStore {
    samples: Vec<u16>,
    boundaries: Vec<usize>,
    cursor: usize,
    revolution_end: usize,
    revolution: usize,
    index_ct: usize,
}

impl FluxStore {
    /// Create a `FluxStore` from raw big-endian samples and cumulative revolution end indices.
    /// The cursor is positioned at the start of the first revolution.
    pub(crate) fn from_raw(samples: Vec<u16>, boundaries: Vec<usize>) -> Self {
        debug_assert_eq!(boundaries.last().copied().unwrap_or(0), samples.len());
        let revolution_end = boundaries.first().copied().unwrap_or(0);
        FluxStore {
            samples,
            boundaries,
            cursor: 0,
            revolution_end,
            revolution: 0,
            index_ct: 0,
        }
    }

    /// Create a `FluxStore` from per-revolution tick counts given in host byte order.
    pub fn from_revolutions(revolutions: &[&[u16]]) -> Self {
        let mut samples = Vec::with_capacity(revolutions.iter().map(|r| r.len()).sum());
        let mut boundaries = Vec::with_capacity(revolutions.len());
        for rev in revolutions {
            samples.extend(rev.iter().map(|t| t.to_be()));
            boundaries.push(samples.len());
        }
        FluxStore::from_raw(samples, boundaries)
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// The number of revolutions held in the store.
    pub fn revolutions(&self) -> usize {
        self.boundaries.len()
    }

    /// The total number of samples across all revolutions.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// The index of the next sample to be read.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The revolution currently being replayed.
    pub fn revolution(&self) -> usize {
        self.revolution
    }

    /// The number of index boundaries crossed since the store was loaded.
    pub fn index_count(&self) -> usize {
        self.index_ct
    }

    fn revolution_range(&self, rev: usize) -> Option<std::ops::Range<usize>> {
        let end = *self.boundaries.get(rev)?;
        let start = if rev == 0 { 0 } else { self.boundaries[rev - 1] };
        Some(start..end)
    }

    /// Resolve the samples of revolution `rev` into flux intervals in nanoseconds, without
    /// disturbing the read cursor. Trailing overflow samples with no terminating transition are
    /// dropped.
    pub fn intervals(&self, rev: usize) -> Option<Vec<u64>> {
        let range = self.revolution_range(rev)?;
        let mut intervals = Vec::with_capacity(range.len());
        let mut ticks = 0;
        for &raw in &self.samples[range] {
            match u16::from_be(raw) {
                0 => ticks += SCP_OVERFLOW_TICKS,
                t => {
                    intervals.push((ticks + t as u64) * SCP_NS_PER_TICK);
                    ticks = 0;
                }
            }
        }
        Some(intervals)
    }
}

impl FluxSource for FluxStore {
    /// Read the next flux interval. Zero samples are overflow markers and accumulate into the
    /// following transition. When the end of the current revolution is reached the cursor moves
    /// to the start of the next revolution in sequence and [FluxRead::Index] is returned; any
    /// pending overflow is discarded.
    fn next_flux(&mut self) -> FluxRead {
        let mut ticks: u64 = 0;

        loop {
            if self.cursor >= self.revolution_end {
                if self.boundaries.is_empty() {
                    return FluxRead::Index;
                }
                let rev = self.index_ct % self.boundaries.len();
                self.index_ct += 1;
                self.revolution = rev;
                self.revolution_end = self.boundaries[rev];
                self.cursor = if rev == 0 { 0 } else { self.boundaries[rev - 1] };
                return FluxRead::Index;
            }

            let t = u16::from_be(self.samples[self.cursor]);
            self.cursor += 1;

            if t == 0 {
                ticks += SCP_OVERFLOW_TICKS;
                continue;
            }

            ticks += t as u64;
            break;
        }

        FluxRead::Interval(ticks * SCP_NS_PER_TICK)
    }
}
