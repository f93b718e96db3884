use pairtools::acq::CancelFlag;
use pairtools::pat::G2Data;
use pairtools::stats::{self, CumulativeMean, LongTerm, PairParams, Retry, Sampler, SinglesParams};
use pairtools::{Error, Event};

mod common;
use common::Scripted;

fn params(left: i64, right: i64) -> PairParams {
    PairParams {
        duration: 1.0,
        bin_width: 1.0,
        bins: 20,
        peak: 118,
        left,
        right,
        ch_start: 0,
        ch_stop: 3,
        darkcounts: [0.0; 4],
        accumulate: false,
    }
}

fn g2(histogram: Vec<u64>, n_start: u64, n_stop: u64) -> G2Data {
    G2Data {
        histogram,
        n_start,
        n_stop,
        t_max: 1e9,
    }
}

#[test]
fn single_bin_window() {
    let mut p = params(0, 0);
    p.bins = 6;
    assert_eq!(p.window_size(), 1);
    // Accidentals from bins 3.. average to 2 per bin
    let s = stats::pair_stats(&p, g2(vec![0, 10, 2, 2, 2, 2], 100, 100), 1.0);
    assert_eq!(s.acc_per_bin, 2.0);
    assert_eq!(s.acc, 2.0);
    assert_eq!(s.pairs, 8.0);
}

#[test]
fn three_bin_window() {
    let mut p = params(-1, 1);
    p.bins = 8;
    let s = stats::pair_stats(&p, g2(vec![9, 4, 10, 6, 1, 1, 1, 1], 100, 100), 2.0);
    // (4 + 10 + 6 - 3 * 1) / 2 s
    assert_eq!(s.pairs, 8.5);
    assert_eq!(s.acc, 1.5);
    assert_eq!(s.s1, 50.0);
}

#[test]
fn efficiencies_need_both_singles() {
    assert_eq!(stats::efficiencies(5.0, 0.0, 10.0), (0.0, 0.0, 0.0));
    assert_eq!(stats::efficiencies(5.0, 10.0, 0.0), (0.0, 0.0, 0.0));

    let s = stats::pair_stats(&params(0, 0), g2(vec![0, 50, 0, 0], 0, 100), 1.0);
    assert_eq!((s.e1, s.e2, s.eavg), (0.0, 0.0, 0.0));
}

#[test]
fn efficiencies_are_not_capped() {
    let (e1, e2, eavg) = stats::efficiencies(200.0, 100.0, 100.0);
    assert_eq!((e1, e2, eavg), (200.0, 200.0, 200.0));
    let (e1, e2, _) = stats::efficiencies(10.0, 100.0, 50.0);
    assert_eq!((e1, e2), (20.0, 10.0));
    assert_eq!(stats::efficiencies(-3.0, 100.0, 50.0), (0.0, 0.0, 0.0));
}

#[test]
fn dark_counts_are_not_floored() {
    let mut p = params(0, 0);
    p.darkcounts = [10.0, 0.0, 0.0, 1.0];
    let s = stats::pair_stats(&p, g2(vec![0; 20], 5, 5), 1.0);
    assert_eq!(s.s1, -5.0);
    assert_eq!(s.s2, 4.0);
}

#[test]
fn accumulate_reports_counts() {
    let mut p = params(0, 0);
    p.bins = 4;
    p.accumulate = true;
    p.darkcounts = [1.0, 0.0, 0.0, 0.0];
    let s = stats::pair_stats(&p, g2(vec![0, 12, 0, 0], 40, 60), 2.0);
    assert_eq!(s.pairs, 12.0);
    assert_eq!(s.s1, 38.0);
    assert_eq!(s.s2, 60.0);
}

#[test]
fn sampler_measures_pairs() {
    let capture = common::pair_source(2000, 1.0, 118.0, 5000, 7);
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::default());
    let s = sampler.read_pairs(&params(0, 0), false).unwrap();

    assert_eq!(s.histogram.len(), 20);
    // min_range = 117 ns, so the 118 ns delay lands in bin 1
    assert!(s.histogram[1] >= 2000);
    assert!(s.pairs > 1990.0 && s.pairs < 2010.0, "pairs {}", s.pairs);
    assert_eq!(s.s1, 7000.0 / s.inttime);
    assert!((s.inttime - 1.0).abs() < 1e-9);
    assert!(s.e1 > 27.0 && s.e1 < 29.0);
}

#[test]
fn cached_events_give_identical_samples() {
    let capture = common::pair_source(500, 1.0, 118.0, 500, 11);
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::default());
    let p = params(-1, 1);

    let first = sampler.read_pairs(&p, false).unwrap();
    let second = sampler.read_pairs(&p, true).unwrap();
    let third = sampler.read_pairs(&p, true).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(sampler.acquisition().triggers, 1);

    // Another channel pair on the same events
    let other = p.with_pair(3, 0, -118, -1, 1);
    sampler.read_pairs(&other, true).unwrap();
    assert_eq!(sampler.acquisition().triggers, 1);
}

#[test]
fn cache_is_filled_on_first_use() {
    let capture = common::pair_source(10, 1.0, 118.0, 10, 3);
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::default());
    assert!(sampler.cached().is_none());
    sampler.read_pairs(&params(0, 0), true).unwrap();
    assert_eq!(sampler.acquisition().triggers, 1);
    assert!(sampler.cached().is_some());
    sampler.clear_cache();
    assert!(sampler.cached().is_none());
}

#[test]
fn short_integration_is_retried() {
    let short = common::pair_source(10, 0.5, 118.0, 10, 1);
    let good = common::pair_source(10, 1.0, 118.0, 10, 2);
    let mut sampler = Sampler::new(Scripted::new(vec![short.clone(), short, good]), Retry::default());
    let s = sampler.read_pairs(&params(0, 0), false).unwrap();
    assert_eq!(sampler.acquisition().triggers, 3);
    assert!((s.inttime - 1.0).abs() < 1e-9);
}

#[test]
fn retries_are_bounded() {
    let long = common::pair_source(10, 2.5, 118.0, 10, 1);
    let retry = Retry {
        max_attempts: Some(3),
        cancel: None,
    };
    let mut sampler = Sampler::new(Scripted::new(vec![long]), retry);
    match sampler.read_pairs(&params(0, 0), false) {
        Err(Error::RetriesExhausted { attempts: 3, ratio }) => assert!((ratio - 2.5).abs() < 1e-9),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sampler.acquisition().triggers, 3);
}

#[test]
fn cancelled_before_trigger() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let capture = common::pair_source(10, 1.0, 118.0, 10, 1);
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::until_cancelled(cancel));
    assert!(matches!(sampler.read_pairs(&params(0, 0), false), Err(Error::Cancelled)));
    assert_eq!(sampler.acquisition().triggers, 0);
}

#[test]
fn no_events_is_not_retried() {
    let capture = vec![Event { time: 0.0, mask: 0b0100 }, Event { time: 1e9, mask: 0b0100 }];
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::default());
    assert!(matches!(
        sampler.read_pairs(&params(0, 0), false),
        Err(Error::NoEventsRecorded { start: 0, stop: 3 })
    ));
    assert_eq!(sampler.acquisition().triggers, 1);
}

#[test]
fn invalid_window() {
    let mut sampler = Sampler::new(Scripted::new(vec![]), Retry::default());
    assert!(matches!(
        sampler.read_pairs(&params(1, 0), false),
        Err(Error::InvalidWindow { left: 1, right: 0 })
    ));
    let mut p = params(0, 0);
    p.ch_stop = 7;
    assert!(matches!(sampler.read_pairs(&p, false), Err(Error::InvalidChannel(7))));
    assert_eq!(sampler.acquisition().triggers, 0);
}

#[test]
fn window_lands_on_bin_one() {
    let mut p = params(-2, 3);
    p.bin_width = 2.0;
    assert_eq!(p.min_range(), (118.0 - 2.0 - 1.0) * 2.0);
    assert_eq!(p.window_size(), 6);
    assert_eq!(p.absolute_bin(1), 116);
}

#[test]
fn singles_rates() {
    let capture = common::events(&[
        (0, &[0.0, 1e8, 2e8]),
        (1, &[5e8]),
        (3, &[1e9]),
    ]);
    let mut sampler = Sampler::new(Scripted::new(vec![capture]), Retry::default());
    let sp = SinglesParams {
        duration: 1.0,
        darkcounts: [1.0, 0.0, 0.0, 0.5],
        accumulate: false,
    };
    let s = sampler.read_singles(&sp).unwrap();
    assert_eq!(s.rates, [2.0, 1.0, 0.0, 0.5]);
    assert_eq!(s.total(), 3.5);

    let sp = SinglesParams { duration: 0.8, accumulate: true, ..sp };
    let s = sampler.read_singles(&sp).unwrap();
    assert_eq!(s.rates, [2.0, 1.0, 0.0, 0.5]);
}

#[test]
fn short_singles_integration_is_retried() {
    let short = common::events(&[(0, &[0.0, 1e8]), (3, &[2e8])]);
    let good = common::events(&[(0, &[0.0, 5e8]), (3, &[1e9])]);
    let mut sampler = Sampler::new(Scripted::new(vec![short, good]), Retry::default());
    let sp = SinglesParams {
        duration: 1.0,
        darkcounts: [0.0; 4],
        accumulate: false,
    };
    let s = sampler.read_singles(&sp).unwrap();
    assert_eq!(sampler.acquisition().triggers, 2);
    assert!((s.inttime - 1.0).abs() < 1e-9);
    for (rate, expected) in s.rates.iter().zip([2.0, 0.0, 0.0, 1.0]) {
        assert!((rate - expected).abs() < 1e-9);
    }
}

#[test]
fn singles_retries_are_bounded() {
    let short = common::events(&[(0, &[0.0, 1e8]), (3, &[2e8])]);
    let retry = Retry {
        max_attempts: Some(2),
        cancel: None,
    };
    let mut sampler = Sampler::new(Scripted::new(vec![short]), retry);
    let sp = SinglesParams {
        duration: 1.0,
        darkcounts: [0.0; 4],
        accumulate: false,
    };
    match sampler.read_singles(&sp) {
        Err(Error::RetriesExhausted { attempts, ratio }) => {
            assert_eq!(attempts, 2);
            assert!((ratio - 0.2).abs() < 1e-9);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sampler.acquisition().triggers, 2);
}

#[test]
fn long_term_resets_at_threshold() {
    let mut sample = stats::pair_stats(&params(0, 0), g2(vec![0; 20], 100, 200), 1.0);
    let mut longterm = LongTerm::default();

    for (i, pairs) in [10.0, 20.0].iter().enumerate() {
        sample.pairs = *pairs;
        assert_eq!(longterm.add(&sample, 3.0), None);
        assert_eq!(longterm.count, i as u32 + 1);
    }
    sample.pairs = 30.0;
    let avg = longterm.add(&sample, 3.0).unwrap();
    assert_eq!(avg.count, 3);
    assert_eq!(avg.inttime, 3.0);
    assert_eq!(avg.pairs, 20.0);
    assert_eq!(avg.s1, 100.0);
    assert_eq!(avg.e1, 10.0);
    assert_eq!(avg.e2, 20.0);
    assert_eq!(longterm, LongTerm::default());

    // Crossing rather than hitting the threshold also resets
    sample.inttime = 1.1;
    assert!(longterm.add(&sample, 3.0).is_none());
    assert!(longterm.add(&sample, 3.0).is_none());
    assert!(longterm.add(&sample, 3.0).is_some());
    assert_eq!(longterm.count, 0);
}

#[test]
fn cumulative_mean() {
    let mut mean = CumulativeMean::default();
    assert!(mean.is_empty());
    mean.push(&[1.0, 2.0, 0.0, 4.0]);
    let m = mean.push(&[3.0, 4.0, 0.0, 8.0]);
    assert_eq!(m, [2.0, 3.0, 0.0, 6.0]);
    assert_eq!(mean.len(), 2);
}
