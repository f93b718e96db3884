//! `tsv2a1 [INPUT] > OUTPUT`
//!
//! Convert tab-separated (mask, time in ns) events, from a file or stdin,
//! into a legacy `-a1` capture, e.g. to replay synthetic data through the
//! monitor with `pairmon pairs --replay`.

use pairtools::{de, ser};

use anyhow::{anyhow, Result};
use std::env;
use std::fs::File;
use std::io::{stdin, stdout, BufWriter, Read};

fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    let stdin = stdin();
    let rdr: Box<dyn Read> = match args.len() - 1 {
        0 => Box::new(stdin.lock()),
        1 => Box::new(File::open(&args[1])?),
        _ => return Err(anyhow!("Wrong number of arguments")),
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_reader(rdr);
    let events = de::tsv(&mut rdr)?;

    let stdout = stdout();
    let mut wtr = BufWriter::new(stdout.lock());
    ser::a1(&mut wtr, &events, true)?;
    Ok(())
}
