//! Configuration: the parameter set of a monitoring session
//!
//! Configuration files are [TOML](https://toml.io) `key = value` files using
//! the same names as the command line options, e.g.
//!
//! ```toml
//! bins = 20
//! peak = 118
//! left = -1
//! right = 0
//! ```
//!
//! Files are layered: keys of a later file override an earlier one, and
//! keys not mentioned keep their previous value. Channels are counted from
//! 1 here, as on the front panel of the card.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::stats::{PairParams, SinglesParams};
use crate::{Error, Result, NCHAN};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Integration time, in s
    pub time: f64,
    /// Width of coincidence time bins, in ns
    pub width: f64,
    pub bins: usize,
    /// Absolute bin position of the coincidence window
    pub peak: i64,
    pub left: i64,
    pub right: i64,
    pub ch_start: u8,
    pub ch_stop: u8,
    pub darkcount1: f64,
    pub darkcount2: f64,
    pub darkcount3: f64,
    pub darkcount4: f64,
    pub accumulate: bool,
    /// Long-term integration time in s, 0 to disable
    pub avgtime: f64,
    /// 0: no histogram, 1: once, 2: every cycle
    pub histogram: u8,
    pub average: bool,
    pub device: PathBuf,
    pub readevents: PathBuf,
    pub tmpfile: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<PathBuf>,
    pub quiet: bool,
    pub no_color: bool,
    pub verbosity: u8,
    /// Attempts per measurement, 0 to retry until interrupted
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,
    /// Monitor rows before stopping, 0 to run until interrupted
    pub cycles: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            time: 1.0,
            width: 1.0,
            bins: 500,
            peak: -250,
            left: 0,
            right: 0,
            ch_start: 1,
            ch_stop: 4,
            darkcount1: 0.0,
            darkcount2: 0.0,
            darkcount3: 0.0,
            darkcount4: 0.0,
            accumulate: false,
            avgtime: 0.0,
            histogram: 0,
            average: false,
            device: PathBuf::from("/dev/ioboards/usbtmst0"),
            readevents: PathBuf::from("/usr/bin/readevents7"),
            tmpfile: PathBuf::from("/tmp/quick_timestamp"),
            logging: None,
            quiet: false,
            no_color: false,
            verbosity: 0,
            retries: 0,
            replay: None,
            cycles: 0,
        }
    }
}

/// Convert a front-panel channel (1-4) to a library channel index (0-3)
pub fn channel_index(ch: u8) -> Result<u8> {
    match ch {
        1..=4 => Ok(ch - 1),
        _ => Err(Error::InvalidChannel(ch)),
    }
}

impl Config {
    /// Parse a complete configuration, defaults filling in missing keys
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Override the keys present in `s`, keeping all others
    pub fn merge_toml(&mut self, s: &str) -> Result<()> {
        let overlay: toml::Value = toml::from_str(s)?;
        let mut base = toml::Value::try_from(&*self)?;
        if let (Some(table), toml::Value::Table(overlay)) = (base.as_table_mut(), overlay) {
            for (key, value) in overlay {
                table.insert(key, value);
            }
        }
        *self = base.try_into()?;
        Ok(())
    }

    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let s = fs::read_to_string(path)?;
        self.merge_toml(&s)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn darkcounts(&self) -> [f64; NCHAN] {
        [self.darkcount1, self.darkcount2, self.darkcount3, self.darkcount4]
    }

    /// `None` when retrying until interrupted. A replayed recording is the
    /// same on every trigger, so it gets a single attempt.
    pub fn max_attempts(&self) -> Option<u32> {
        if self.replay.is_some() {
            return Some(1);
        }
        match self.retries {
            0 => None,
            n => Some(n),
        }
    }

    pub fn pair_params(&self) -> Result<PairParams> {
        let params = PairParams {
            duration: self.time,
            bin_width: self.width,
            bins: self.bins,
            peak: self.peak,
            left: self.left,
            right: self.right,
            ch_start: channel_index(self.ch_start)?,
            ch_stop: channel_index(self.ch_stop)?,
            darkcounts: self.darkcounts(),
            accumulate: self.accumulate,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn singles_params(&self) -> SinglesParams {
        SinglesParams {
            duration: self.time,
            darkcounts: self.darkcounts(),
            accumulate: self.accumulate,
        }
    }
}
