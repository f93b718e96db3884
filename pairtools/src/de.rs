//! Deserialization of timestamp captures, supporting raw `-a1` files and `.tsv`

use crate::{Error, Event, Result, TSTEP};
use std::io::{BufReader, ErrorKind, Read};

/// Channel pattern bits of the low word
pub const PATTERN_MASK: u32 = 0xf;
/// Marks a dummy event inserted by the card on counter rollover
pub const DUMMY_FLAG: u32 = 0x10;

/// Deserialize a raw capture in the readevents `-a1` format.
///
/// Each record is two little-endian 32-bit words. The 54-bit timestamp is
/// the high word followed by the upper 22 bits of the low word, counting
/// in steps of [`TSTEP`]; the lowest four bits hold the channel pattern.
/// In `legacy` files the high word comes first. Dummy rollover events are
/// dropped, as they carry no detector pattern.
pub fn a1(rdr: impl Read, legacy: bool) -> Result<Vec<Event>> {
    let mut brdr = BufReader::new(rdr);
    let mut events = Vec::new();
    let mut buf = [0u8; 8];

    loop {
        match fill(&mut brdr, &mut buf)? {
            0 => break,
            8 => {}
            n => return Err(Error::Parse(format!("truncated record of {} bytes", n))),
        }
        let w0 = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let w1 = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let (high, low) = if legacy { (w0, w1) } else { (w1, w0) };
        if low & DUMMY_FLAG != 0 {
            continue;
        }
        let ticks = ((high as u64) << 22) | (low >> 10) as u64;
        events.push(Event {
            time: ticks as f64 * TSTEP,
            mask: (low & PATTERN_MASK) as u8,
        });
    }
    Ok(events)
}

// Read until the buffer is full or the stream ends, returning the byte count
fn fill(rdr: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match rdr.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(n)
}

/// Deserialize events from tab-separated values (mask, time in ns).
pub fn tsv(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<Event>> {
    let mut events: Vec<Event> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 2 {
            return Err(Error::Parse(format!("expected 2 fields, got {}", record.len())));
        }
        let mask = record[0]
            .trim()
            .parse::<u8>()
            .map_err(|e| Error::Parse(format!("mask {:?}: {}", &record[0], e)))?;
        let time = record[1]
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::Parse(format!("time {:?}: {}", &record[1], e)))?;
        events.push(Event { time, mask });
    }
    Ok(events)
}
