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

    src/flux/pll.rs

    A software model of a floppy disk controller's data separator PLL.

    The PLL is stepped one bit cell at a time. Each step consumes enough flux
    time to fill one clock period and reports whether a flux transition fell
    inside that window. The clock period drifts to follow the flux timing,
    within a fixed range around its centre.
*/
use crate::{
    config::MIN_CLOCK_CENTRE,
    flux::{FluxRead, FluxSource},
};
use std::fmt::{self, Display, Formatter};
use strum::{EnumIter, EnumString};

/// Maximum clock adjustment in either direction, as a percentage of the clock centre.
pub const CLOCK_MAX_ADJ: i64 = 10;

/// PLL operating mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PllMode {
    /// Fixed clock, phase snaps to each flux transition.
    #[strum(serialize = "fixed")]
    FixedClock,
    /// Variable clock, phase snaps to each flux transition.
    #[strum(serialize = "variable")]
    VariableClock,
    /// Variable clock, phase is only partially corrected at each flux transition, as a real
    /// controller does.
    #[default]
    #[strum(serialize = "authentic")]
    Authentic,
}

impl Display for PllMode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PllMode::FixedClock => write!(f, "fixed clock"),
            PllMode::VariableClock => write!(f, "variable clock"),
            PllMode::Authentic => write!(f, "authentic"),
        }
    }
}

/// The result of a single PLL step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PllBit {
    /// A bit cell was clocked. `true` if a flux transition fell within it.
    Bit(bool),
    /// The flux source reached an index boundary. The PLL has been reset to its nominal state.
    Index,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pll {
    mode: PllMode,
    /// Current clock period in nanoseconds.
    clock: i64,
    /// Nominal clock period in nanoseconds.
    clock_centre: i64,
    /// Nanoseconds until the next flux transition. May be negative after a transition arrives
    /// early in its window.
    flux: i64,
    /// Number of zero bits clocked since the last transition.
    clocked_zeros: u32,
    /// Nanoseconds elapsed since the latency counter was last taken.
    latency: i64,
}

impl Default for Pll {
    fn default() -> Self {
        Pll::new(crate::config::DEFAULT_CLOCK_CENTRE, PllMode::default())
    }
}

impl Pll {
    /// Create a PLL centred on `clock_centre` nanoseconds. Values below [MIN_CLOCK_CENTRE] are
    /// raised to it.
    pub fn new(clock_centre: u32, mode: PllMode) -> Self {
        if clock_centre < MIN_CLOCK_CENTRE {
            log::warn!(
                "Pll::new(): clock centre of {}ns raised to {}ns",
                clock_centre,
                MIN_CLOCK_CENTRE
            );
        }
        let clock_centre = clock_centre.max(MIN_CLOCK_CENTRE);
        Pll {
            mode,
            clock: clock_centre as i64,
            clock_centre: clock_centre as i64,
            flux: 0,
            clocked_zeros: 0,
            latency: 0,
        }
    }

    pub fn mode(&self) -> PllMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PllMode) {
        self.mode = mode;
    }

    /// The current clock period in nanoseconds.
    pub fn clock(&self) -> i64 {
        self.clock
    }

    pub fn clock_centre(&self) -> i64 {
        self.clock_centre
    }

    pub fn clock_min(&self) -> i64 {
        (self.clock_centre * (100 - CLOCK_MAX_ADJ)) / 100
    }

    pub fn clock_max(&self) -> i64 {
        (self.clock_centre * (100 + CLOCK_MAX_ADJ)) / 100
    }

    /// Nanoseconds remaining until the next flux transition.
    pub fn flux(&self) -> i64 {
        self.flux
    }

    pub fn clocked_zeros(&self) -> u32 {
        self.clocked_zeros
    }

    pub fn latency(&self) -> i64 {
        self.latency
    }

    /// Return the accumulated latency and reset the counter.
    pub fn take_latency(&mut self) -> i64 {
        std::mem::take(&mut self.latency)
    }

    /// Return the clock and phase to their nominal state. The mode and latency are kept.
    pub fn reset(&mut self) {
        self.clock = self.clock_centre;
        self.flux = 0;
        self.clocked_zeros = 0;
    }

    /// Clock out the next bit cell from `source`.
    pub fn next_bit<S: FluxSource + ?Sized>(&mut self, source: &mut S) -> PllBit {
        while self.flux < self.clock / 2 {
            match source.next_flux() {
                FluxRead::Interval(ns) => {
                    self.flux += ns as i64;
                    self.clocked_zeros = 0;
                }
                FluxRead::Index => {
                    self.reset();
                    return PllBit::Index;
                }
            }
        }

        self.latency += self.clock;
        self.flux -= self.clock;

        if self.flux >= self.clock / 2 {
            self.clocked_zeros += 1;
            return PllBit::Bit(false);
        }

        if self.mode != PllMode::FixedClock {
            // Adjust clock frequency according to the phase mismatch.
            if (1..=3).contains(&self.clocked_zeros) {
                // In sync: adjust base clock by 10% of phase mismatch.
                let diff = self.flux / (self.clocked_zeros as i64 + 1);
                self.clock += diff / 10;
            }
            else {
                // Out of sync: drift back towards the centre.
                self.clock += (self.clock_centre - self.clock) / 10;
            }
            self.clock = self.clock.clamp(self.clock_min(), self.clock_max());
        }
        else {
            self.clock = self.clock_centre;
        }

        // The authentic mode only pulls the window halfway towards the transition.
        let new_flux = match self.mode {
            PllMode::Authentic => self.flux / 2,
            _ => 0,
        };
        self.latency += self.flux - new_flux;
        self.flux = new_flux;
        self.clocked_zeros = 0;

        PllBit::Bit(true)
    }
}
