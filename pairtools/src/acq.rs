//! Acquisition interface to the timestamp card, and sources implementing it

use crate::{de, pat, Error, Event, Result, CHAN4, NCHAN};
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-channel event counts over one acquisition
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Counts {
    pub counts: [u64; NCHAN],
    /// Recorded integration time, in seconds
    pub inttime: f64,
}

/// A timestamp source that can be triggered for a fixed duration.
///
/// Calls block for roughly `duration` seconds.
pub trait Acquisition {
    /// Record events for `duration` seconds.
    fn trigger(&mut self, duration: f64) -> Result<Vec<Event>>;

    /// Record events for `duration` seconds, keeping only the singles counts.
    fn get_counts(&mut self, duration: f64) -> Result<Counts> {
        let events = self.trigger(duration)?;
        counts(&events)
    }
}

impl<A: Acquisition + ?Sized> Acquisition for Box<A> {
    fn trigger(&mut self, duration: f64) -> Result<Vec<Event>> {
        (**self).trigger(duration)
    }

    fn get_counts(&mut self, duration: f64) -> Result<Counts> {
        (**self).get_counts(duration)
    }
}

/// Singles counts and integration time of an event stream
pub fn counts(events: &[Event]) -> Result<Counts> {
    let mut counts = [0u64; NCHAN];
    for ch in CHAN4 {
        counts[ch as usize] = pat::singles(events, ch)?;
    }
    Ok(Counts {
        counts,
        inttime: pat::integration_time(events) * 1e-9,
    })
}

/// Shared flag raised when the user interrupts the run.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once the flag is raised
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Replays a recorded capture file on every trigger, without waiting.
///
/// The integration time seen by the statistics is the span recorded in the
/// file, so the requested duration should match the recording.
pub struct Replay {
    pub path: PathBuf,
    pub legacy: bool,
}

impl Replay {
    pub fn new(path: impl Into<PathBuf>, legacy: bool) -> Self {
        Replay {
            path: path.into(),
            legacy,
        }
    }
}

impl Acquisition for Replay {
    fn trigger(&mut self, _duration: f64) -> Result<Vec<Event>> {
        let file = File::open(&self.path)?;
        de::a1(file, self.legacy)
    }
}
