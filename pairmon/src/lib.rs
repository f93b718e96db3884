use anyhow::{Context, Result};
use argh::FromArgs;
use pairtools::cfg::Config;
use std::path::Path;
use std::str::FromStr;

pub mod device;
pub mod interrupt;
pub mod monitor;
pub mod out;
pub mod scripts;

/// Configuration file picked up from the working directory, if present
pub const DEFAULT_CONFIG: &str = "pairmon.default.conf";

/// The measurement to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Script {
    /// Single pair measurement, printed bare
    PairsOnce,
    /// Continuous pair statistics
    Pairs,
    /// Continuous singles of all channels
    Singles,
    /// Single measurement of both fixed channel pairs
    Visibility,
    /// Continuous statistics of both fixed channel pairs
    TwoPairs,
}

impl FromStr for Script {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pairs_once" => Ok(Script::PairsOnce),
            "pairs" => Ok(Script::Pairs),
            "singles" => Ok(Script::Singles),
            "visibility" => Ok(Script::Visibility),
            "2pairs" => Ok(Script::TwoPairs),
            _ => Err(format!(
                "unknown script {:?}, expected one of pairs_once, pairs, singles, visibility, 2pairs",
                s
            )),
        }
    }
}

#[derive(Debug, FromArgs, Clone, Default)]
/// Continuously report photon pair source statistics from a timestamp card.
/// Options not given fall back to the configuration files, then to defaults.
pub struct CliArgs {
    /// script: pairs_once, pairs, singles, visibility or 2pairs
    #[argh(positional)]
    pub script: Option<Script>,
    /// print version information
    #[argh(switch, short = 'V')]
    pub version: bool,
    /// configuration file, later files override earlier ones
    #[argh(option, short = 'c')]
    pub config: Vec<String>,
    /// save the resulting configuration to this path, then exit
    #[argh(option)]
    pub save: Option<String>,
    /// debug verbosity, 0-2
    #[argh(option, short = 'v')]
    pub verbosity: Option<u8>,
    /// append measurements to this file
    #[argh(option, short = 'L')]
    pub logging: Option<String>,
    /// suppress error messages
    #[argh(switch, short = 'q')]
    pub quiet: bool,
    /// disable color highlighting
    #[argh(switch)]
    pub no_color: bool,
    /// path to timestamp device
    #[argh(option, short = 'U')]
    pub device: Option<String>,
    /// path to readevents binary
    #[argh(option, short = 'S')]
    pub readevents: Option<String>,
    /// path to temporary file for timestamp storage
    #[argh(option, short = 'O')]
    pub tmpfile: Option<String>,
    /// replay a recorded capture file instead of acquiring
    #[argh(option)]
    pub replay: Option<String>,
    /// attempts per measurement when the integration time is off, 0 for unlimited
    #[argh(option)]
    pub retries: Option<u32>,
    /// integration time, in s
    #[argh(option, short = 'T')]
    pub time: Option<f64>,
    /// print raw counts instead of counts/s
    #[argh(switch)]
    pub accumulate: bool,
    /// dark count rate of channel 1, in counts/s
    #[argh(option)]
    pub darkcount1: Option<f64>,
    /// dark count rate of channel 2, in counts/s
    #[argh(option)]
    pub darkcount2: Option<f64>,
    /// dark count rate of channel 3, in counts/s
    #[argh(option)]
    pub darkcount3: Option<f64>,
    /// dark count rate of channel 4, in counts/s
    #[argh(option)]
    pub darkcount4: Option<f64>,
    /// print the running average instead [singles]
    #[argh(switch)]
    pub average: bool,
    /// show the histogram: 1 once, 2 every measurement [pairs]
    #[argh(option, short = 'H')]
    pub histogram: Option<u8>,
    /// width of coincidence time bins, in ns [pairs]
    #[argh(option, short = 'W')]
    pub width: Option<f64>,
    /// number of coincidence time bins [pairs]
    #[argh(option, short = 'B')]
    pub bins: Option<usize>,
    /// absolute bin position of the coincidence window [pairs]
    #[argh(option)]
    pub peak: Option<i64>,
    /// left offset of the coincidence window relative to peak [pairs]
    #[argh(option)]
    pub left: Option<i64>,
    /// right offset of the coincidence window relative to peak [pairs]
    #[argh(option)]
    pub right: Option<i64>,
    /// long-term integration time, in s [pairs]
    #[argh(option)]
    pub avgtime: Option<f64>,
    /// start channel, 1-4 [pairs]
    #[argh(option)]
    pub ch_start: Option<u8>,
    /// stop channel, 1-4 [pairs]
    #[argh(option)]
    pub ch_stop: Option<u8>,
    /// stop after this many rows, 0 to run until interrupted
    #[argh(option)]
    pub cycles: Option<u64>,
}

fn set<T>(field: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(v) = value {
        *field = v.clone();
    }
}

impl CliArgs {
    /// Layer the default file, each `--config` file and the command line
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::default();
        if Path::new(DEFAULT_CONFIG).exists() {
            config
                .merge_file(DEFAULT_CONFIG)
                .with_context(|| format!("reading {}", DEFAULT_CONFIG))?;
        }
        for path in &self.config {
            config
                .merge_file(path)
                .with_context(|| format!("reading {}", path))?;
        }
        self.apply(&mut config);
        Ok(config)
    }

    /// Override the configuration with every option given on the command line
    pub fn apply(&self, config: &mut Config) {
        set(&mut config.verbosity, &self.verbosity);
        set(&mut config.retries, &self.retries);
        set(&mut config.time, &self.time);
        set(&mut config.darkcount1, &self.darkcount1);
        set(&mut config.darkcount2, &self.darkcount2);
        set(&mut config.darkcount3, &self.darkcount3);
        set(&mut config.darkcount4, &self.darkcount4);
        set(&mut config.histogram, &self.histogram);
        set(&mut config.width, &self.width);
        set(&mut config.bins, &self.bins);
        set(&mut config.peak, &self.peak);
        set(&mut config.left, &self.left);
        set(&mut config.right, &self.right);
        set(&mut config.avgtime, &self.avgtime);
        set(&mut config.ch_start, &self.ch_start);
        set(&mut config.ch_stop, &self.ch_stop);
        set(&mut config.cycles, &self.cycles);
        if let Some(p) = &self.device {
            config.device = p.into();
        }
        if let Some(p) = &self.readevents {
            config.readevents = p.into();
        }
        if let Some(p) = &self.tmpfile {
            config.tmpfile = p.into();
        }
        if let Some(p) = &self.logging {
            config.logging = Some(p.into());
        }
        if let Some(p) = &self.replay {
            config.replay = Some(p.into());
        }
        config.quiet |= self.quiet;
        config.no_color |= self.no_color;
        config.accumulate |= self.accumulate;
        config.average |= self.average;
    }
}
