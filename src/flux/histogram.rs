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

//! This module defines a [FluxHistogram] structure which summarizes the flux
//! intervals of a revolution. The first peak of the histogram corresponds to
//! the shortest regular flux spacing on the track, which can be used to pick
//! a clock centre for the PLL when a disk is not recorded at the nominal rate.

use histogram::{Bucket, Histogram};
use std::ops::RangeInclusive;

pub struct FluxHistogram {
    histogram: Histogram,
    maxima: Vec<(u64, RangeInclusive<u64>)>,
    total_time: u64,
    count: usize,
}

impl FluxHistogram {
    /// Produce a [FluxHistogram] over a slice of flux intervals in nanoseconds.
    pub fn new(intervals: &[u64]) -> Self {
        // Max value power of 2^14 = 16384 (16us)
        // Grouping power of 3 produces sharp spikes without false maxima
        let mut histogram = Histogram::new(3, 14).unwrap();

        let mut total_time = 0;
        for &ns in intervals {
            total_time += ns;
            // Intervals beyond the histogram range are long gaps and are not counted.
            _ = histogram.increment(ns);
        }

        FluxHistogram {
            histogram,
            maxima: Vec::new(),
            total_time,
            count: intervals.len(),
        }
    }

    /// The sum of all intervals, in nanoseconds. For a full revolution this is the index time.
    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Locate local maxima in the histogram by bucket. Buckets holding less than `threshold`
    /// (a fraction of the total count, default 0.5%) are ignored.
    pub fn find_local_maxima(&mut self, threshold: Option<f64>) -> &[(u64, RangeInclusive<u64>)] {
        let mut peaks = vec![];
        let mut previous_bucket: Option<Bucket> = None;
        let mut current_bucket: Option<Bucket> = None;

        let total_count: u64 = self.histogram.into_iter().map(|bucket| bucket.count()).sum();
        let threshold = (total_count as f64 * threshold.unwrap_or(0.005)).round() as u64;

        for bucket in self.histogram.into_iter() {
            if let (Some(prev), Some(curr)) = (previous_bucket.as_ref(), current_bucket.as_ref()) {
                if curr.count() >= prev.count() && curr.count() > bucket.count() && curr.count() >= threshold {
                    peaks.push((curr.count(), curr.start()..=curr.end()));
                }
            }
            previous_bucket = current_bucket.take();
            current_bucket = Some(bucket.clone());
        }

        log::debug!("FluxHistogram::find_local_maxima(): found {} peaks", peaks.len());
        self.maxima = peaks;
        &self.maxima
    }

    /// Estimate the shortest regular flux spacing in nanoseconds, from the first histogram peak.
    pub fn base_transition_time(&mut self) -> Option<u64> {
        if self.maxima.is_empty() {
            self.find_local_maxima(None);
        }

        let Some((_, first_peak)) = self.maxima.first()
        else {
            log::warn!("FluxHistogram::base_transition_time(): No peaks found");
            return None;
        };

        Some((first_peak.start() + first_peak.end()) / 2)
    }

    /// Suggest a PLL clock centre for MFM data: the shortest MFM flux spacing is two bit cells.
    pub fn suggested_clock_centre(&mut self) -> Option<u32> {
        self.base_transition_time().map(|ns| (ns / 2) as u32)
    }
}
