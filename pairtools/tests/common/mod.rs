#![allow(dead_code)]

use pairtools::acq::Acquisition;
use pairtools::{Error, Event, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Merge per-channel event times into one time-ordered stream
pub fn events(channels: &[(u8, &[f64])]) -> Vec<Event> {
    let mut events: Vec<Event> = channels
        .iter()
        .flat_map(|&(ch, times)| times.iter().map(move |&time| Event { time, mask: 1 << ch }))
        .collect();
    events.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());
    events
}

/// Photon pair source: `n` pairs in channels 0 (start) and 3 (stop) with the
/// stop delayed by `delay` whole ns, plus `background` uncorrelated events per
/// channel. Channel 2 marks the start and end of the `duration` s capture.
pub fn pair_source(n: usize, duration: f64, delay: f64, background: usize, seed: u64) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(seed);
    // Whole nanoseconds keep the delays exact
    let span = (duration * 1e9) as u64;
    let mut start = Vec::new();
    let mut stop = Vec::new();
    for _ in 0..n {
        let t = rng.gen_range(1000..span - 1000) as f64;
        start.push(t);
        stop.push(t + delay);
    }
    for _ in 0..background {
        start.push(rng.gen_range(0..span) as f64);
        stop.push(rng.gen_range(0..span) as f64);
    }
    events(&[(0, &start), (3, &stop), (2, &[0.0, span as f64])])
}

/// Acquisition replaying a fixed list of captures; the last one repeats.
pub struct Scripted {
    pub captures: VecDeque<Vec<Event>>,
    pub triggers: usize,
}

impl Scripted {
    pub fn new(captures: Vec<Vec<Event>>) -> Self {
        Scripted {
            captures: captures.into(),
            triggers: 0,
        }
    }
}

impl Acquisition for Scripted {
    fn trigger(&mut self, _duration: f64) -> Result<Vec<Event>> {
        self.triggers += 1;
        if self.captures.len() > 1 {
            Ok(self.captures.pop_front().unwrap())
        } else {
            self.captures
                .front()
                .cloned()
                .ok_or_else(|| Error::Acquisition(String::from("no capture scripted")))
        }
    }
}
