//! Serialization of timestamp captures and histograms

use crate::de::PATTERN_MASK;
use crate::{Event, Result, TSTEP};
use std::fmt::Display;
use std::io::Write;

/// Serialize events in the readevents `-a1` format, the inverse of
/// [`crate::de::a1`]. Times are rounded to the nearest [`TSTEP`].
pub fn a1(wtr: &mut impl Write, events: &[Event], legacy: bool) -> Result<()> {
    for event in events {
        let ticks = (event.time / TSTEP).round() as u64;
        let high = (ticks >> 22) as u32;
        let low = (((ticks & 0x3f_ffff) as u32) << 10) | (event.mask as u32 & PATTERN_MASK);
        let (w0, w1) = if legacy { (high, low) } else { (low, high) };
        wtr.write_all(&w0.to_le_bytes())?;
        wtr.write_all(&w1.to_le_bytes())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize a histogram to tab-separated (delay, value) records, raw counts
/// or normalised.
pub fn histogram_tsv<T: Display>(
    wtr: &mut csv::Writer<impl Write>,
    axis: &[f64],
    histogram: &[T],
) -> Result<()> {
    for (x, y) in axis.iter().zip(histogram) {
        wtr.write_record(&[x.to_string(), y.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
