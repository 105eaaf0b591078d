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

//! Decoder configuration.

use crate::{flux::pll::PllMode, FluxSyncError};

/// The nominal bit cell period in nanoseconds. 2000ns corresponds to a 250Kbps MFM disk
/// rotating at 300RPM.
pub const DEFAULT_CLOCK_CENTRE: u32 = 2000;
/// The smallest usable clock centre. Below this the lower clock bound or the half-clock
/// sampling threshold reaches zero and the PLL can no longer consume flux.
pub const MIN_CLOCK_CENTRE: u32 = 10;

/// Parameters applied to every track loaded through a [crate::DriveSlots] context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// The nominal bit cell period, in nanoseconds, the PLL is centred on.
    pub clock_centre: u32,
    /// The PLL mode selected whenever a new track is loaded.
    pub pll_mode: PllMode,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            clock_centre: DEFAULT_CLOCK_CENTRE,
            pll_mode: PllMode::Authentic,
        }
    }
}

impl DecoderConfig {
    pub fn with_clock_centre(mut self, clock_centre: u32) -> Self {
        self.clock_centre = clock_centre;
        self
    }

    pub fn with_pll_mode(mut self, pll_mode: PllMode) -> Self {
        self.pll_mode = pll_mode;
        self
    }

    /// Check that the clock centre is at least [MIN_CLOCK_CENTRE] nanoseconds.
    pub fn validate(&self) -> Result<(), FluxSyncError> {
        if self.clock_centre < MIN_CLOCK_CENTRE {
            log::error!(
                "DecoderConfig::validate(): clock centre of {}ns is below the minimum of {}ns",
                self.clock_centre,
                MIN_CLOCK_CENTRE
            );
            return Err(FluxSyncError::ParameterError);
        }
        Ok(())
    }
}
