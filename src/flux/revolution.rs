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

    src/flux/revolution.rs

    Assembles one revolution of PLL output into the two buffers consumed by a
    disk controller emulator: a packed MSB-first bitstream of 16-bit words and
    a timing array holding one coarse latency value per 8 bit cells.
*/
use crate::flux::{
    pll::{Pll, PllBit},
    FluxSource,
};

/// Default capacity of a [RevolutionBuffer], in bit cells. Comfortably holds a revolution of a
/// 1Mbps track at 300RPM.
pub const DEFAULT_REVOLUTION_BITS: usize = 0x40000;

/// Owned output buffers sized for a given number of bit cells.
#[derive(Clone, Debug)]
pub struct RevolutionBuffer {
    pub bits: Vec<u16>,
    pub timings: Vec<u16>,
}

impl Default for RevolutionBuffer {
    fn default() -> Self {
        RevolutionBuffer::with_bit_capacity(DEFAULT_REVOLUTION_BITS)
    }
}

impl RevolutionBuffer {
    pub fn with_bit_capacity(bits: usize) -> Self {
        RevolutionBuffer {
            bits: vec![0; bits.div_ceil(16)],
            timings: vec![0; bits.div_ceil(8)],
        }
    }

    /// The number of bit cells that can be stored.
    pub fn bit_capacity(&self) -> usize {
        (self.bits.len() * 16).min(self.timings.len() * 8)
    }

    /// Borrow the bit and timing buffers separately, for passing to the decode functions.
    pub fn split_mut(&mut self) -> (&mut [u16], &mut [u16]) {
        (&mut self.bits, &mut self.timings)
    }

    /// Return the value of bit cell `idx`.
    pub fn bit(&self, idx: usize) -> Option<bool> {
        self.bits.get(idx >> 4).map(|w| w & (0x8000 >> (idx & 15)) != 0)
    }
}

/// Run the PLL until it reaches an index boundary, packing each bit cell into `bits` and a
/// timing value for each group of 8 cells into `timings`.
///
/// Bit `i` is stored in bit `15 - (i % 16)` of `bits[i / 16]`. A full group of 8 cells records
/// its accumulated latency divided by 16. A trailing partial group of `k` cells records its
/// latency divided by `2 * (1 + k)`.
///
/// Returns the number of bit cells stored. If the revolution does not fit in the buffers the
/// remainder is decoded but discarded, so the source is always left at the next revolution.
pub fn decode_revolution<S: FluxSource + ?Sized>(
    pll: &mut Pll,
    source: &mut S,
    bits: &mut [u16],
    timings: &mut [u16],
) -> usize {
    let capacity = (bits.len() * 16).min(timings.len() * 8);
    let mut i = 0;

    pll.take_latency();
    while let PllBit::Bit(bit) = pll.next_bit(source) {
        if i < capacity {
            if (i & 15) == 0 {
                bits[i >> 4] = 0;
            }
            if bit {
                bits[i >> 4] |= 0x8000 >> (i & 15);
            }
        }
        if (i & 7) == 7 {
            let latency = pll.take_latency();
            if i < capacity {
                timings[i >> 3] = (latency / 16) as u16;
            }
        }
        i += 1;
    }

    let partial = i & 7;
    if partial != 0 {
        let latency = pll.take_latency();
        if i < capacity {
            timings[i >> 3] = (latency / (2 * (1 + partial as i64))) as u16;
        }
    }

    if i > capacity {
        log::warn!(
            "decode_revolution(): revolution of {} bits exceeds buffer capacity of {} bits, truncated",
            i,
            capacity
        );
        return capacity;
    }

    log::trace!("decode_revolution(): decoded {} bits", i);
    i
}
