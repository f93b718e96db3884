//! The monitor loop: acquire, aggregate, emit, until interrupted.

use anyhow::Result;
use pairtools::acq::CancelFlag;
use pairtools::Error;
use std::io;
use tracing::{debug, info};

use crate::out::{Cell, Sink};

/// Table rows printed between two headers
pub const HEADER_EVERY: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stop {
    Cancelled,
    /// Cycle limit reached
    Finished,
}

/// Monitor states. Integration time validation happens inside
/// [`Cycle::acquire`], which only returns accepted samples.
#[derive(Clone, Debug, PartialEq)]
pub enum State<S> {
    Idle,
    Acquiring,
    Aggregating(S),
    Emitting(S),
    Stopped(Stop),
}

/// One measurement script run by [`Monitor`].
pub trait Cycle {
    type Sample;

    fn header(&self) -> Vec<Cell>;

    /// Take one measurement. Blocks for the integration time.
    fn acquire(&mut self) -> pairtools::Result<Self::Sample>;

    /// Fold the sample into running aggregates, possibly replacing it.
    fn aggregate(&mut self, sample: Self::Sample) -> Self::Sample {
        sample
    }

    /// Output shown before the row. Returns whether the header has to be
    /// repeated after it.
    fn preamble(&mut self, _sample: &Self::Sample, _sink: &mut Sink) -> io::Result<bool> {
        Ok(false)
    }

    fn row(&self, sample: &Self::Sample) -> Vec<Cell>;

    /// Row left under the table and overwritten by the next cycle
    fn trailer(&self) -> Option<Vec<Cell>> {
        None
    }
}

pub struct Monitor<C> {
    cycle: C,
    sink: Sink,
    cancel: CancelFlag,
    rows_left: usize,
    cycles: u64,
    max_cycles: Option<u64>,
}

impl<C: Cycle> Monitor<C> {
    pub fn new(cycle: C, sink: Sink, cancel: CancelFlag) -> Self {
        Monitor {
            cycle,
            sink,
            cancel,
            rows_left: 0,
            cycles: 0,
            max_cycles: None,
        }
    }

    /// Stop after `n` emitted rows
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cycle(&self) -> &C {
        &self.cycle
    }

    pub fn step(&mut self, state: State<C::Sample>) -> Result<State<C::Sample>> {
        let next = match state {
            State::Idle => State::Acquiring,
            State::Acquiring => {
                if self.cancel.is_cancelled() {
                    return Ok(State::Stopped(Stop::Cancelled));
                }
                if self.max_cycles.map_or(false, |n| self.cycles >= n) {
                    return Ok(State::Stopped(Stop::Finished));
                }
                match self.cycle.acquire() {
                    // A measurement finishing after an interrupt is discarded
                    Ok(_) if self.cancel.is_cancelled() => State::Stopped(Stop::Cancelled),
                    Ok(sample) => State::Aggregating(sample),
                    Err(Error::Cancelled) => State::Stopped(Stop::Cancelled),
                    Err(e) => return Err(e.into()),
                }
            }
            State::Aggregating(sample) => State::Emitting(self.cycle.aggregate(sample)),
            State::Emitting(sample) => {
                self.emit(&sample)?;
                self.cycles += 1;
                State::Acquiring
            }
            State::Stopped(stop) => State::Stopped(stop),
        };
        Ok(next)
    }

    pub fn run(&mut self) -> Result<Stop> {
        debug!("monitor started");
        let mut state = State::Idle;
        loop {
            state = self.step(state)?;
            if let State::Stopped(stop) = state {
                info!(cycles = self.cycles, ?stop, "monitor stopped");
                return Ok(stop);
            }
        }
    }

    fn emit(&mut self, sample: &C::Sample) -> io::Result<()> {
        let repeat_header = self.cycle.preamble(sample, &mut self.sink)?;
        if self.rows_left == 0 || repeat_header {
            self.rows_left = HEADER_EVERY;
            self.sink.header(&self.cycle.header())?;
        }
        self.rows_left -= 1;
        self.sink.row(&self.cycle.row(sample))?;
        if let Some(trailer) = self.cycle.trailer() {
            self.sink.transient(&trailer)?;
        }
        Ok(())
    }
}
