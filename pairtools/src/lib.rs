pub mod acq;
pub mod bit;
pub mod cfg;
pub mod de;
pub mod error;
pub mod pat;
pub mod peak;
pub mod ser;
pub mod stats;

pub use error::{Error, Result};

/// The basic representation of a timestamped detector event
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct Event {
    /// Time in nanoseconds from an arbitrary offset
    pub time: f64,
    /// Bitmask of the detector channels (bit 0 is channel 0) that fired
    pub mask: u8,
}

/// Number of detector channels on the timestamp card
pub const NCHAN: usize = 4;
/// Library channel indices; the command line counts channels from 1
pub const CHAN4: [u8; NCHAN] = [0, 1, 2, 3];
/// Timestamp resolution of the capture format, in ns
pub const TSTEP: f64 = 0.125;
