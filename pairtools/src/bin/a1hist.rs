//! `a1hist [OPTIONS] CAPTURE`
//!
//! Build the coincidence histogram of a raw `-a1` capture file and write
//! tab-separated (delay in ns, count) records to stdout, or normalised g2
//! values with `--normalise`, e.g.
//!
//!     a1hist --ch-start 1 --ch-stop 4 --min -250 --bins 500 capture.a1 > g2.tsv

use pairtools::{cfg, de, pat, ser};

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{stdout, Write};

const GIT_VERSION: &str = git_version::git_version!();

#[derive(Debug, argh::FromArgs)]
/// histogram of a raw timestamp capture
struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    version: bool,
    /// capture file path
    #[argh(positional)]
    capture: Option<String>,
    /// start channel (1-4)
    #[argh(option, default = "1")]
    ch_start: u8,
    /// stop channel (1-4)
    #[argh(option, default = "4")]
    ch_stop: u8,
    /// lower edge of the histogram, in ns
    #[argh(option, default = "0.0")]
    min: f64,
    /// bin width, in ns
    #[argh(option, default = "1.0")]
    width: f64,
    /// number of bins
    #[argh(option, default = "500")]
    bins: usize,
    /// delay added to the stop channel, in ns
    #[argh(option, default = "0.0")]
    stop_delay: f64,
    /// words in native (non-legacy) order
    #[argh(switch)]
    native: bool,
    /// normalise to the accidental level, uncorrelated light at 1
    #[argh(switch)]
    normalise: bool,
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    let capture = args.capture.ok_or_else(|| anyhow!("no capture file given"))?;
    let file = File::open(&capture).with_context(|| format!("opening {}", capture))?;
    let events = de::a1(file, !args.native)?;

    let params = pat::HistogramParams {
        bins: args.bins,
        bin_width: args.width,
        min_range: args.min,
        ch_start: cfg::channel_index(args.ch_start)?,
        ch_stop: cfg::channel_index(args.ch_stop)?,
        stop_delay: args.stop_delay,
    };
    let data = pat::g2_extract(&events, &params)?;

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_writer(stdout);
    let axis = pat::delay_axis(&params);
    if args.normalise {
        let g2 = pat::g2_normalised(&data, args.width)
            .ok_or_else(|| anyhow!("cannot normalise, capture has no span or an empty channel"))?;
        ser::histogram_tsv(&mut wtr, &axis, &g2)?;
    } else {
        ser::histogram_tsv(&mut wtr, &axis, &data.histogram)?;
    }
    Ok(())
}
