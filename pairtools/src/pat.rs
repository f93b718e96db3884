//! Tools for extracting coincidence patterns from timestamp datasets

use crate::bit::{check_channel, BitOps};
use crate::{Error, Event, Result};

/// Event times (ns) of a single channel, in capture order.
pub fn channel_times(events: &[Event], ch: u8) -> Result<Vec<f64>> {
    let ch = check_channel(ch)?;
    Ok(events
        .iter()
        .filter(|e| e.mask.check(ch as usize))
        .map(|e| e.time)
        .collect())
}

/// Count number of events in a given channel.
pub fn singles(events: &[Event], ch: u8) -> Result<u64> {
    let ch = check_channel(ch)?;
    Ok(events.iter().filter(|e| e.mask.check(ch as usize)).count() as u64)
}

/// Span of the capture in ns, from first to last event.
pub fn integration_time(events: &[Event]) -> f64 {
    match (events.first(), events.last()) {
        (Some(first), Some(last)) => last.time - first.time,
        _ => 0.0,
    }
}

/// Histogram of `stop - start` delays in `[0, bins * bin_width)`.
///
/// Both slices must be sorted. For every start event the lower pointer is
/// advanced past stop events earlier than it, then stop events are scanned
/// forward until the delay leaves the histogram range, so each start only
/// visits the stops inside its window. Bins are half-open: a delay on a bin
/// edge belongs to the bin starting there.
pub fn delay_histogram(start: &[f64], stop: &[f64], bins: usize, bin_width: f64) -> Vec<u64> {
    let mut histogram = vec![0u64; bins];
    let range = bins as f64 * bin_width;
    let mut lo = 0;
    for &t0 in start {
        while lo < stop.len() && stop[lo] < t0 {
            lo += 1;
        }
        for &t1 in stop[lo..].iter().take_while(|&&t1| t1 - t0 < range) {
            let bin = ((t1 - t0) / bin_width) as usize;
            // Float rounding can land exactly on the upper edge
            if bin < bins {
                histogram[bin] += 1;
            }
        }
    }
    histogram
}

/// Parameters of a g2 extraction from a raw event stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramParams {
    pub bins: usize,
    /// Bin width in ns
    pub bin_width: f64,
    /// Delay of the lower edge of bin 0, in ns
    pub min_range: f64,
    pub ch_start: u8,
    pub ch_stop: u8,
    /// Added to the stop channel times, in ns
    pub stop_delay: f64,
}

impl HistogramParams {
    pub fn validate(&self) -> Result<()> {
        check_channel(self.ch_start)?;
        check_channel(self.ch_stop)?;
        if self.bins == 0 || !(self.bin_width > 0.0) {
            return Err(Error::InvalidHistogram {
                bins: self.bins,
                bin_width: self.bin_width,
            });
        }
        Ok(())
    }
}

/// Result of a g2 extraction
#[derive(Clone, Debug, PartialEq)]
pub struct G2Data {
    pub histogram: Vec<u64>,
    /// Events in the start channel
    pub n_start: u64,
    /// Events in the stop channel
    pub n_stop: u64,
    /// Span of the whole capture, in ns
    pub t_max: f64,
}

/// Split the stream into the two channels and build their delay histogram.
///
/// Fails with [`Error::NoEventsRecorded`] when neither channel saw an event,
/// rather than returning an empty histogram.
pub fn g2_extract(events: &[Event], params: &HistogramParams) -> Result<G2Data> {
    params.validate()?;
    let t1 = channel_times(events, params.ch_start)?;
    let mut t2 = channel_times(events, params.ch_stop)?;
    if t1.is_empty() && t2.is_empty() {
        return Err(Error::NoEventsRecorded {
            start: params.ch_start,
            stop: params.ch_stop,
        });
    }

    let shift = params.stop_delay - params.min_range;
    t2.iter_mut().for_each(|t| *t += shift);
    let histogram = delay_histogram(&t1, &t2, params.bins, params.bin_width);

    Ok(G2Data {
        histogram,
        n_start: t1.len() as u64,
        n_stop: t2.len() as u64,
        t_max: integration_time(events),
    })
}

/// Lower edge of every histogram bin, in ns.
pub fn delay_axis(params: &HistogramParams) -> Vec<f64> {
    (0..params.bins)
        .map(|i| params.min_range + i as f64 * params.bin_width)
        .collect()
}

/// Normalise the histogram to the accidental level `N1 * N2 * dT / T`, so
/// that uncorrelated light sits at 1. `None` without a usable capture span.
pub fn g2_normalised(data: &G2Data, bin_width: f64) -> Option<Vec<f64>> {
    if !(data.t_max > 0.0) {
        return None;
    }
    let norm = data.n_start as f64 * data.n_stop as f64 / data.t_max * bin_width;
    if norm == 0.0 {
        return None;
    }
    Some(data.histogram.iter().map(|&b| b as f64 / norm).collect())
}
