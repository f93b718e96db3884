//! Error taxonomy for acquisition and pair statistics

use thiserror::Error;

/// Result type alias for pairtools operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Channel index outside of `0..4`.
    #[error("invalid channel {0}, the card has 4 inputs")]
    InvalidChannel(u8),

    /// Neither of the two requested channels recorded an event.
    #[error("no timestamp events recorded in channels {} and {}", .start + 1, .stop + 1)]
    NoEventsRecorded { start: u8, stop: u8 },

    /// Coincidence window with `right < left`.
    #[error("invalid coincidence window: left {left} > right {right}")]
    InvalidWindow { left: i64, right: i64 },

    /// Histogram without bins or with a non-positive bin width.
    #[error("invalid histogram: {bins} bins of width {bin_width} ns")]
    InvalidHistogram { bins: usize, bin_width: f64 },

    /// Acquisition duration that is not a positive number of seconds.
    #[error("invalid integration time: {0} s")]
    InvalidDuration(f64),

    /// Integration time kept deviating from the requested duration.
    #[error("integration time out of range after {attempts} attempts (last ratio {ratio:.3})")]
    RetriesExhausted { attempts: u32, ratio: f64 },

    /// Interrupted by the user.
    #[error("acquisition cancelled")]
    Cancelled,

    /// The capture process misbehaved.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Malformed input data.
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
