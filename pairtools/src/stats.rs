//! Pair and singles statistics on top of the g2 histogram
//!
//! A [`Sampler`] owns the acquisition source and the raw events of its last
//! trigger. Each call to [`Sampler::read_pairs`] produces one immutable
//! [`PairStats`]; the monitor folds those into a [`LongTerm`] accumulator.

use std::cmp;
use tracing::{debug, warn};

use crate::acq::{Acquisition, CancelFlag};
use crate::pat::{self, G2Data, HistogramParams};
use crate::{Error, Event, Result, NCHAN};

/// Attempts made by [`Retry::default`] before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Accepted range of recorded over requested integration time, exclusive
pub const INTTIME_RATIO: (f64, f64) = (0.75, 2.0);

/// Whether a recorded integration time is close enough to the request
pub fn inttime_ok(inttime: f64, duration: f64) -> bool {
    let ratio = inttime / duration;
    INTTIME_RATIO.0 < ratio && ratio < INTTIME_RATIO.1
}

/// How long to keep re-acquiring when the integration time is off.
#[derive(Clone, Debug)]
pub struct Retry {
    /// `None` retries until cancelled
    pub max_attempts: Option<u32>,
    pub cancel: Option<CancelFlag>,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            cancel: None,
        }
    }
}

impl Retry {
    /// Retry indefinitely, stopping only when `cancel` is raised
    pub fn until_cancelled(cancel: CancelFlag) -> Self {
        Retry {
            max_attempts: None,
            cancel: Some(cancel),
        }
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(cancel) => cancel.check(),
            None => Ok(()),
        }
    }

    fn check_attempts(&self, attempts: u32, ratio: f64) -> Result<()> {
        match self.max_attempts {
            Some(max) if attempts >= max => Err(Error::RetriesExhausted { attempts, ratio }),
            _ => Ok(()),
        }
    }
}

/// Acquisition parameters for one pair measurement.
///
/// `peak`, `left` and `right` are in units of `bin_width`; the coincidence
/// window spans bins `peak + left ..= peak + right`. Channels are 0-indexed.
#[derive(Clone, Debug, PartialEq)]
pub struct PairParams {
    /// Integration time in seconds
    pub duration: f64,
    /// Bin width in ns
    pub bin_width: f64,
    pub bins: usize,
    pub peak: i64,
    pub left: i64,
    pub right: i64,
    pub ch_start: u8,
    pub ch_stop: u8,
    /// Dark count rate of each channel, in counts/s
    pub darkcounts: [f64; NCHAN],
    /// Report counts over the integration time instead of rates
    pub accumulate: bool,
}

impl PairParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.duration > 0.0) {
            return Err(Error::InvalidDuration(self.duration));
        }
        if self.right < self.left {
            return Err(Error::InvalidWindow {
                left: self.left,
                right: self.right,
            });
        }
        self.histogram_params().validate()
    }

    pub fn window_size(&self) -> usize {
        (self.right - self.left + 1) as usize
    }

    /// Lower edge of the histogram in ns, placing the window at bin 1
    pub fn min_range(&self) -> f64 {
        (self.peak + self.left - 1) as f64 * self.bin_width
    }

    /// Absolute bin position of a histogram index
    pub fn absolute_bin(&self, index: usize) -> i64 {
        index as i64 + self.peak + self.left - 1
    }

    pub fn histogram_params(&self) -> HistogramParams {
        HistogramParams {
            bins: self.bins,
            bin_width: self.bin_width,
            min_range: self.min_range(),
            ch_start: self.ch_start,
            ch_stop: self.ch_stop,
            stop_delay: 0.0,
        }
    }

    /// Same acquisition settings, for another channel pair and window
    pub fn with_pair(&self, ch_start: u8, ch_stop: u8, peak: i64, left: i64, right: i64) -> Self {
        PairParams {
            ch_start,
            ch_stop,
            peak,
            left,
            right,
            ..self.clone()
        }
    }
}

/// One pair measurement
#[derive(Clone, Debug, PartialEq)]
pub struct PairStats {
    pub histogram: Vec<u64>,
    /// Recorded integration time in seconds
    pub inttime: f64,
    pub pairs: f64,
    pub acc: f64,
    pub s1: f64,
    pub s2: f64,
    /// Heralding efficiency of the stop channel, in %
    pub e1: f64,
    /// Heralding efficiency of the start channel, in %
    pub e2: f64,
    pub eavg: f64,
    /// Accidental counts per histogram bin, before normalization
    pub acc_per_bin: f64,
}

/// Heralding efficiencies `(e1, e2, eavg)` in %, all zero without singles.
pub fn efficiencies(pairs: f64, s1: f64, s2: f64) -> (f64, f64, f64) {
    if s1 == 0.0 || s2 == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    (
        (100.0 * pairs / s2).max(0.0),
        (100.0 * pairs / s1).max(0.0),
        (100.0 * pairs / (s1 * s2).sqrt()).max(0.0),
    )
}

/// Turn an extracted histogram into pair statistics.
///
/// Accidentals are estimated from the mean of the far half of the histogram,
/// away from the peak. `inttime` is in seconds and must be non-zero.
pub fn pair_stats(params: &PairParams, data: G2Data, inttime: f64) -> PairStats {
    let hist = data.histogram;
    let window_size = params.window_size();

    let acc_start = cmp::max(params.bins / 2, 1);
    let tail = hist.get(acc_start..).unwrap_or(&[]);
    let acc_per_bin = if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<u64>() as f64 / tail.len() as f64
    };
    let acc = window_size as f64 * acc_per_bin;

    let end = cmp::min(1 + window_size, hist.len());
    let coincidences: u64 = hist.get(1..end).map_or(0, |w| w.iter().sum());
    let pairs = coincidences as f64 - acc;

    // Rates per second, then back to counts if accumulating
    let scale = if params.accumulate { inttime } else { 1.0 };
    let s1 = (data.n_start as f64 / inttime - params.darkcounts[params.ch_start as usize]) * scale;
    let s2 = (data.n_stop as f64 / inttime - params.darkcounts[params.ch_stop as usize]) * scale;
    let pairs = pairs / inttime * scale;
    let acc = acc / inttime * scale;
    let (e1, e2, eavg) = efficiencies(pairs, s1, s2);

    PairStats {
        histogram: hist,
        inttime,
        pairs,
        acc,
        s1,
        s2,
        e1,
        e2,
        eavg,
        acc_per_bin,
    }
}

/// Parameters for a singles measurement
#[derive(Clone, Debug, PartialEq)]
pub struct SinglesParams {
    pub duration: f64,
    pub darkcounts: [f64; NCHAN],
    pub accumulate: bool,
}

/// Per-channel singles of one measurement
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Singles {
    pub rates: [f64; NCHAN],
    pub inttime: f64,
}

impl Singles {
    pub fn total(&self) -> f64 {
        self.rates.iter().sum()
    }
}

/// Drives an acquisition source and keeps the events of its last trigger.
pub struct Sampler<A> {
    acq: A,
    cache: Option<Vec<Event>>,
    retry: Retry,
}

impl<A: Acquisition> Sampler<A> {
    pub fn new(acq: A, retry: Retry) -> Self {
        Sampler {
            acq,
            cache: None,
            retry,
        }
    }

    pub fn acquisition(&mut self) -> &mut A {
        &mut self.acq
    }

    /// Events of the last trigger, if any
    pub fn cached(&self) -> Option<&[Event]> {
        self.cache.as_deref()
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Measure pair statistics, re-acquiring until the recorded integration
    /// time matches the requested duration.
    ///
    /// With `use_cache`, the first attempt reuses the events of the previous
    /// trigger; should those fail the integration check, a new acquisition
    /// replaces them.
    pub fn read_pairs(&mut self, params: &PairParams, use_cache: bool) -> Result<PairStats> {
        params.validate()?;
        let hparams = params.histogram_params();
        let mut reuse = use_cache && self.cache.is_some();
        let mut attempts = 0;

        loop {
            self.retry.check_cancel()?;
            if !reuse {
                let events = self.acq.trigger(params.duration)?;
                self.cache = Some(events);
            }
            reuse = false;
            attempts += 1;

            let events = self.cache.as_deref().unwrap_or_default();
            let data = pat::g2_extract(events, &hparams)?;
            let inttime = data.t_max * 1e-9;
            if !inttime_ok(inttime, params.duration) {
                let ratio = inttime / params.duration;
                warn!(attempts, inttime, duration = params.duration, "integration time out of range");
                self.retry.check_attempts(attempts, ratio)?;
                continue;
            }

            let stats = pair_stats(params, data, inttime);
            debug!(
                ch_start = params.ch_start,
                ch_stop = params.ch_stop,
                inttime,
                pairs = stats.pairs,
                acc = stats.acc,
                "pair statistics"
            );
            return Ok(stats);
        }
    }

    /// Measure singles rates of all channels, with the same integration
    /// time check as [`Sampler::read_pairs`].
    pub fn read_singles(&mut self, params: &SinglesParams) -> Result<Singles> {
        if !(params.duration > 0.0) {
            return Err(Error::InvalidDuration(params.duration));
        }
        let mut attempts = 0;
        loop {
            self.retry.check_cancel()?;
            let counts = self.acq.get_counts(params.duration)?;
            attempts += 1;
            let inttime = counts.inttime;
            if !inttime_ok(inttime, params.duration) {
                warn!(attempts, inttime, duration = params.duration, "integration time out of range");
                self.retry.check_attempts(attempts, inttime / params.duration)?;
                continue;
            }

            let scale = if params.accumulate { inttime } else { 1.0 };
            let mut rates = [0.0; NCHAN];
            for (ch, rate) in rates.iter_mut().enumerate() {
                *rate = (counts.counts[ch] as f64 / inttime - params.darkcounts[ch]) * scale;
            }
            debug!(inttime, ?rates, "singles");
            return Ok(Singles { rates, inttime });
        }
    }
}

/// Running sums of pair measurements for the long-term row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LongTerm {
    pub count: u32,
    pub inttime: f64,
    pub pairs: f64,
    pub acc: f64,
    pub s1: f64,
    pub s2: f64,
}

/// Averages over a completed long-term period
#[derive(Clone, Debug, PartialEq)]
pub struct LongTermAverage {
    pub count: u32,
    /// Total integration time of the period
    pub inttime: f64,
    pub pairs: f64,
    pub acc: f64,
    pub s1: f64,
    pub s2: f64,
    pub e1: f64,
    pub e2: f64,
    pub eavg: f64,
}

impl LongTerm {
    /// Fold in a sample. Once the summed integration time reaches
    /// `threshold`, returns the period's averages and starts over.
    pub fn add(&mut self, sample: &PairStats, threshold: f64) -> Option<LongTermAverage> {
        self.count += 1;
        self.inttime += sample.inttime;
        self.pairs += sample.pairs;
        self.acc += sample.acc;
        self.s1 += sample.s1;
        self.s2 += sample.s2;

        if self.inttime >= threshold {
            let average = self.average();
            *self = LongTerm::default();
            Some(average)
        } else {
            None
        }
    }

    pub fn average(&self) -> LongTermAverage {
        let n = cmp::max(self.count, 1) as f64;
        let (pairs, s1, s2) = (self.pairs / n, self.s1 / n, self.s2 / n);
        let (e1, e2, eavg) = if s1 == 0.0 || s2 == 0.0 {
            (0.0, 0.0, 0.0)
        } else {
            (100.0 * pairs / s2, 100.0 * pairs / s1, 100.0 * pairs / (s1 * s2).sqrt())
        };
        LongTermAverage {
            count: self.count,
            inttime: self.inttime,
            pairs,
            acc: self.acc / n,
            s1,
            s2,
            e1,
            e2,
            eavg,
        }
    }
}

/// Cumulative mean of singles rates over all cycles, updated in place so
/// that long runs never hold large sums.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CumulativeMean {
    n: u64,
    mean: [f64; NCHAN],
}

impl CumulativeMean {
    pub fn push(&mut self, rates: &[f64; NCHAN]) -> [f64; NCHAN] {
        self.n += 1;
        let n = self.n as f64;
        for (m, &x) in self.mean.iter_mut().zip(rates) {
            *m = (n - 1.0) / n * *m + x / n;
        }
        self.mean
    }

    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

