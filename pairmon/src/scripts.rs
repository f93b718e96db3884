//! The measurement scripts selectable on the command line.

use anyhow::Result;
use chrono::Local;
use crossterm::style::Color;
use pairtools::acq::{Acquisition, CancelFlag};
use pairtools::cfg::Config;
use pairtools::peak::likely_window;
use pairtools::stats::{
    CumulativeMean, LongTerm, LongTermAverage, PairParams, PairStats, Sampler, Singles,
    SinglesParams,
};
use pairtools::Error;
use std::cmp;
use std::io;
use tracing::warn;

use crate::monitor::{Cycle, Monitor};
use crate::out::{render, Cell, Sink, Style};
use crate::Script;

/// Histogram bins per displayed row
const HISTOGRAM_ROW: usize = 10;

/// Channel pair and coincidence window of one source arm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairSlot {
    pub ch_start: u8,
    pub ch_stop: u8,
    pub peak: i64,
    pub left: i64,
    pub right: i64,
}

/// The two arms measured by `visibility` and `2pairs`: channels 1-2 and 3-4
pub const DUAL_PAIRS: [PairSlot; 2] = [
    PairSlot {
        ch_start: 0,
        ch_stop: 1,
        peak: 219,
        left: -1,
        right: 1,
    },
    PairSlot {
        ch_start: 2,
        ch_stop: 3,
        peak: 190,
        left: -1,
        right: 1,
    },
];

pub fn dual_params(base: &PairParams) -> [PairParams; 2] {
    DUAL_PAIRS.map(|s| base.with_pair(s.ch_start, s.ch_stop, s.peak, s.left, s.right))
}

/// Both arms from a single acquisition
pub fn read_dual<A: Acquisition>(
    sampler: &mut Sampler<A>,
    params: &[PairParams; 2],
) -> pairtools::Result<(PairStats, PairStats)> {
    let first = sampler.read_pairs(&params[0], false)?;
    let second = sampler.read_pairs(&params[1], true)?;
    Ok((first, second))
}

fn timestamp() -> String {
    Local::now().format("%H%M%S").to_string()
}

fn int(x: f64) -> i64 {
    x as i64
}

fn now_cell() -> Cell {
    Cell::styled(timestamp(), Style::dim())
}

fn headers(names: &[&str]) -> Vec<Cell> {
    names.iter().map(Cell::plain).collect()
}

/// Run `script` until it finishes or is interrupted
pub fn run<A: Acquisition>(
    script: Script,
    config: &Config,
    mut sampler: Sampler<A>,
    mut sink: Sink,
    cancel: CancelFlag,
) -> Result<()> {
    match script {
        Script::PairsOnce => finish(pairs_once(&mut sampler, config, &mut sink)),
        Script::Visibility => finish(visibility(&mut sampler, config, &mut sink)),
        Script::Pairs => monitor(Pairs::new(sampler, config)?, config, sink, cancel),
        Script::Singles => monitor(SinglesMonitor::new(sampler, config), config, sink, cancel),
        Script::TwoPairs => monitor(TwoPairs::new(sampler, config), config, sink, cancel),
    }
}

fn monitor<C: Cycle>(cycle: C, config: &Config, sink: Sink, cancel: CancelFlag) -> Result<()> {
    let mut m = Monitor::new(cycle, sink, cancel);
    if config.cycles > 0 {
        m = m.with_max_cycles(config.cycles);
    }
    m.run()?;
    Ok(())
}

fn finish(r: pairtools::Result<()>) -> Result<()> {
    match r {
        Err(Error::Cancelled) => Ok(()),
        r => Ok(r?),
    }
}

/// One pair measurement: pairs, accidentals, both singles
pub fn pairs_once<A: Acquisition>(
    sampler: &mut Sampler<A>,
    config: &Config,
    sink: &mut Sink,
) -> pairtools::Result<()> {
    let s = sampler.read_pairs(&config.pair_params()?, false)?;
    let cells = [
        Cell::plain(format!("{:.1}", s.pairs)),
        Cell::plain(format!("{:.1}", s.acc)),
        Cell::plain(int(s.s1)),
        Cell::plain(int(s.s2)),
    ];
    sink.line(&render(&cells, 0, false))?;
    Ok(())
}

/// Pairs and accidentals of both arms from one acquisition
pub fn visibility<A: Acquisition>(
    sampler: &mut Sampler<A>,
    config: &Config,
    sink: &mut Sink,
) -> pairtools::Result<()> {
    let params = dual_params(&config.pair_params()?);
    let (a, b) = read_dual(sampler, &params)?;
    sink.line(&format!("{:.1} {:.1} {:.1} {:.1}", a.pairs, b.pairs, a.acc, b.acc))?;
    Ok(())
}

/// Continuous pair statistics between the configured channels
pub struct Pairs<A> {
    sampler: Sampler<A>,
    params: PairParams,
    histogram: u8,
    histogram_shown: bool,
    avgtime: f64,
    longterm: LongTerm,
    last_period: Option<(String, LongTermAverage)>,
}

impl<A: Acquisition> Pairs<A> {
    pub fn new(sampler: Sampler<A>, config: &Config) -> pairtools::Result<Self> {
        Ok(Pairs {
            sampler,
            params: config.pair_params()?,
            histogram: config.histogram,
            histogram_shown: false,
            avgtime: config.avgtime,
            longterm: LongTerm::default(),
            last_period: None,
        })
    }

    fn show_histogram(&self, s: &PairStats, sink: &mut Sink) -> io::Result<()> {
        sink.line("")?;
        sink.line("Obtained histogram:")?;
        for chunk in s.histogram.chunks(HISTOGRAM_ROW) {
            let mut cells: Vec<Cell> = chunk.iter().map(Cell::plain).collect();
            cells.resize(HISTOGRAM_ROW, Cell::Blank);
            sink.display(&cells)?;
        }

        let window = match likely_window(&s.histogram, s.acc_per_bin) {
            Some(w) => w,
            None => return Ok(()),
        };
        let peak = self.params.absolute_bin(window.peak_index);
        sink.line(&format!("Maximum {} @ index {}", window.peak_value, peak))?;

        let len = s.histogram.len();
        let current = &s.histogram[cmp::min(1, len)..cmp::min(1 + self.params.window_size(), len)];
        sink.line(&format!("Current window: {:?}", current))?;
        sink.line(&format!("Likely window: {:?}", window.values))?;
        if window.at_edge {
            warn!("likely window reaches the end of the histogram, consider more bins");
        }
        sink.line(&format!(
            "Args: --peak {} --left {} --right {}\n",
            peak, window.left, window.right
        ))
    }
}

impl<A: Acquisition> Cycle for Pairs<A> {
    type Sample = PairStats;

    fn header(&self) -> Vec<Cell> {
        headers(&[
            "TIME", "ITIME", "PAIRS", "ACC", "SINGLE1", "SINGLE2", "EFF1", "EFF2", "EFF_AVG",
        ])
    }

    fn acquire(&mut self) -> pairtools::Result<PairStats> {
        self.sampler.read_pairs(&self.params, false)
    }

    fn aggregate(&mut self, sample: PairStats) -> PairStats {
        if self.avgtime > 0.0 {
            if let Some(average) = self.longterm.add(&sample, self.avgtime) {
                self.last_period = Some((timestamp(), average));
            }
        }
        sample
    }

    fn preamble(&mut self, sample: &PairStats, sink: &mut Sink) -> io::Result<bool> {
        if self.histogram > 1 || (self.histogram == 1 && !self.histogram_shown) {
            self.histogram_shown = true;
            self.show_histogram(sample, sink)?;
        }
        Ok(self.histogram > 1)
    }

    fn row(&self, s: &PairStats) -> Vec<Cell> {
        vec![
            now_cell(),
            Cell::plain(format!("{:.2}", s.inttime)),
            Cell::styled(int(s.pairs), Style::bright()),
            Cell::plain(format!("{:.1}", s.acc)),
            Cell::styled(int(s.s1), Style::fg(Color::Yellow)),
            Cell::styled(int(s.s2), Style::fg(Color::Green)),
            Cell::plain(format!("{:.2}", s.e1)),
            Cell::plain(format!("{:.2}", s.e2)),
            Cell::styled(format!("{:.2}", s.eavg), Style::fg(Color::Cyan)),
        ]
    }

    fn trailer(&self) -> Option<Vec<Cell>> {
        let (time, a) = self.last_period.as_ref()?;
        Some(vec![
            Cell::plain(time),
            Cell::plain(format!("{:.2}", a.inttime)),
            Cell::styled(a.pairs.round() as i64, Style::fg(Color::Red)),
            Cell::plain(format!("{:.1}", a.acc)),
            Cell::plain(a.s1.round() as i64),
            Cell::plain(a.s2.round() as i64),
            Cell::plain(format!("{:.1}", a.e1)),
            Cell::plain(format!("{:.1}", a.e2)),
            Cell::styled(format!("{:.1}", a.eavg), Style::fg(Color::Red)),
        ])
    }
}

/// Continuous singles of all four channels
pub struct SinglesMonitor<A> {
    sampler: Sampler<A>,
    params: SinglesParams,
    average: Option<CumulativeMean>,
}

impl<A: Acquisition> SinglesMonitor<A> {
    pub fn new(sampler: Sampler<A>, config: &Config) -> Self {
        SinglesMonitor {
            sampler,
            params: config.singles_params(),
            average: config.average.then(CumulativeMean::default),
        }
    }
}

impl<A: Acquisition> Cycle for SinglesMonitor<A> {
    type Sample = Singles;

    fn header(&self) -> Vec<Cell> {
        headers(&["TIME", "INTTIME", "CH1", "CH2", "CH3", "CH4", "TOTAL"])
    }

    fn acquire(&mut self) -> pairtools::Result<Singles> {
        self.sampler.read_singles(&self.params)
    }

    fn aggregate(&mut self, mut sample: Singles) -> Singles {
        if let Some(mean) = &mut self.average {
            sample.rates = mean.push(&sample.rates).map(|x| (x * 10.0).round() / 10.0);
        }
        sample
    }

    fn row(&self, s: &Singles) -> Vec<Cell> {
        let mut cells = vec![now_cell(), Cell::plain(format!("{:.2}", s.inttime))];
        cells.extend(s.rates.iter().map(|&r| Cell::plain(int(r))));
        cells.push(Cell::styled(int(s.total()), Style::bright()));
        cells
    }
}

/// Continuous pairs of both source arms
pub struct TwoPairs<A> {
    sampler: Sampler<A>,
    params: [PairParams; 2],
}

impl<A: Acquisition> TwoPairs<A> {
    pub fn new(sampler: Sampler<A>, config: &Config) -> Self {
        let base = PairParams {
            duration: config.time,
            bin_width: config.width,
            bins: config.bins,
            peak: 0,
            left: 0,
            right: 0,
            ch_start: 0,
            ch_stop: 0,
            darkcounts: config.darkcounts(),
            accumulate: config.accumulate,
        };
        TwoPairs {
            sampler,
            params: dual_params(&base),
        }
    }
}

impl<A: Acquisition> Cycle for TwoPairs<A> {
    type Sample = (PairStats, PairStats);

    fn header(&self) -> Vec<Cell> {
        headers(&["TIME", "P1", "A1", "S11", "S12", "P2", "A2", "S21", "S22"])
    }

    fn acquire(&mut self) -> pairtools::Result<Self::Sample> {
        read_dual(&mut self.sampler, &self.params)
    }

    fn row(&self, (a, b): &Self::Sample) -> Vec<Cell> {
        vec![
            now_cell(),
            Cell::styled(int(a.pairs), Style::fg(Color::Yellow)),
            Cell::styled(format!("{:.1}", a.acc), Style::bright()),
            Cell::plain(int(a.s1)),
            Cell::plain(int(a.s2)),
            Cell::styled(int(b.pairs), Style::fg(Color::Green)),
            Cell::styled(format!("{:.1}", b.acc), Style::bright()),
            Cell::plain(int(b.s1)),
            Cell::plain(int(b.s2)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::out::tests::Shared;
    use pairtools::stats::Retry;
    use pairtools::Event;

    /// Returns the same capture on every trigger
    struct Fixed {
        events: Vec<Event>,
        triggers: usize,
    }

    impl Acquisition for Fixed {
        fn trigger(&mut self, _duration: f64) -> pairtools::Result<Vec<Event>> {
            self.triggers += 1;
            Ok(self.events.clone())
        }
    }

    /// One second capture with 1000 pairs in channels 1 and 4, 5 ns apart
    fn capture() -> Vec<Event> {
        let mut events = vec![Event { time: 0.0, mask: 0b0100 }];
        for k in 0..1000 {
            let t = (k * 1_000_000 + 1000) as f64;
            events.push(Event { time: t, mask: 0b0001 });
            events.push(Event { time: t + 5.0, mask: 0b1000 });
        }
        events.push(Event { time: 1e9, mask: 0b0100 });
        events
    }

    fn sampler() -> Sampler<Fixed> {
        let fixed = Fixed {
            events: capture(),
            triggers: 0,
        };
        Sampler::new(fixed, Retry::default())
    }

    fn config() -> Config {
        Config {
            bins: 20,
            peak: 5,
            ..Config::default()
        }
    }

    fn sink() -> (Sink, Shared) {
        let out = Shared::default();
        (Sink::new(Box::new(out.clone()), None, false), out)
    }

    fn last_row(text: &str) -> Vec<String> {
        let line = text.lines().last().unwrap_or_default();
        line.split_whitespace().skip(1).map(String::from).collect()
    }

    #[test]
    fn pairs_rows() {
        let (sink, out) = sink();
        let cycle = Pairs::new(sampler(), &config()).unwrap();
        let mut m = Monitor::new(cycle, sink, CancelFlag::new()).with_max_cycles(2);
        m.run().unwrap();

        let text = out.text();
        assert!(text.starts_with("   TIME   ITIME   PAIRS"));
        assert!(!text.contains("Obtained histogram"));
        assert_eq!(
            last_row(&text),
            ["1.00", "1000", "0.0", "1000", "1000", "100.00", "100.00", "100.00"]
        );
    }

    #[test]
    fn pairs_histogram_once() {
        let (sink, out) = sink();
        let config = Config {
            histogram: 1,
            ..config()
        };
        let cycle = Pairs::new(sampler(), &config).unwrap();
        Monitor::new(cycle, sink, CancelFlag::new())
            .with_max_cycles(3)
            .run()
            .unwrap();

        let text = out.text();
        assert_eq!(text.matches("Obtained histogram:").count(), 1);
        assert!(text.contains("Maximum 1000 @ index 5"));
        assert!(text.contains("Current window: [1000]"));
        assert!(text.contains("Likely window: [1000]"));
        assert!(text.contains("Args: --peak 5 --left 0 --right 0"));
        assert_eq!(text.matches("PAIRS").count(), 1);
    }

    #[test]
    fn pairs_histogram_every_cycle() {
        let (sink, out) = sink();
        let config = Config {
            histogram: 2,
            ..config()
        };
        let cycle = Pairs::new(sampler(), &config).unwrap();
        Monitor::new(cycle, sink, CancelFlag::new())
            .with_max_cycles(3)
            .run()
            .unwrap();

        let text = out.text();
        assert_eq!(text.matches("Obtained histogram:").count(), 3);
        assert_eq!(text.matches("PAIRS").count(), 3);
    }

    #[test]
    fn pairs_long_term_row() {
        let (sink, out) = sink();
        let config = Config {
            avgtime: 2.0,
            ..config()
        };
        let cycle = Pairs::new(sampler(), &config).unwrap();
        Monitor::new(cycle, sink, CancelFlag::new())
            .with_max_cycles(3)
            .run()
            .unwrap();

        // completed after the second cycle and repeated after the third
        let text = out.text();
        assert_eq!(text.matches('\r').count(), 2);
        let period = text.split('\r').next().and_then(|s| s.lines().last()).unwrap();
        let fields: Vec<_> = period.split_whitespace().skip(1).collect();
        assert_eq!(fields, ["2.00", "1000", "0.0", "1000", "1000", "100.0", "100.0", "100.0"]);
    }

    #[test]
    fn singles_rows() {
        let (sink, out) = sink();
        let config = Config {
            average: true,
            ..config()
        };
        Monitor::new(SinglesMonitor::new(sampler(), &config), sink, CancelFlag::new())
            .with_max_cycles(2)
            .run()
            .unwrap();
        assert_eq!(last_row(&out.text()), ["1.00", "1000", "0", "2", "1000", "2002"]);
    }

    #[test]
    fn dual_pairs_share_one_acquisition() {
        let mut s = sampler();
        let base = config().pair_params().unwrap();
        let params = dual_params(&base);
        assert_eq!((params[0].ch_start, params[0].ch_stop, params[0].peak), (0, 1, 219));
        assert_eq!((params[1].ch_start, params[1].ch_stop, params[1].peak), (2, 3, 190));
        assert_eq!(params[1].bins, 20);

        let (a, b) = read_dual(&mut s, &params).unwrap();
        assert_eq!(s.acquisition().triggers, 1);
        assert_eq!(a.s1, 1000.0);
        assert_eq!(a.s2, 0.0);
        assert_eq!(b.s1, 2.0);
        assert_eq!(b.s2, 1000.0);
    }

    #[test]
    fn pairs_once_line() {
        let (mut sink, out) = sink();
        pairs_once(&mut sampler(), &config(), &mut sink).unwrap();
        assert_eq!(out.text(), "1000.0 0.0 1000 1000\n");
    }

    #[test]
    fn visibility_line() {
        let mut events = vec![Event { time: 0.0, mask: 0b0001 }];
        for k in 0..1000 {
            let t = (k * 1_000_000 + 1000) as f64;
            events.push(Event { time: t, mask: 0b0100 });
            events.push(Event { time: t + 190.0, mask: 0b1000 });
        }
        events.push(Event { time: 1e9, mask: 0b0001 });
        let mut s = Sampler::new(Fixed { events, triggers: 0 }, Retry::default());

        let (mut sink, out) = sink();
        visibility(&mut s, &config(), &mut sink).unwrap();
        assert_eq!(out.text(), "0.0 1000.0 0.0 0.0\n");
        assert_eq!(s.acquisition().triggers, 1);
    }

    #[test]
    fn invalid_channel_rejected() {
        let config = Config {
            ch_stop: 5,
            ..config()
        };
        assert!(matches!(
            Pairs::new(sampler(), &config),
            Err(Error::InvalidChannel(5))
        ));
    }
}
