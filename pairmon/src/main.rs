use anyhow::{anyhow, Result};
use pairmon::device::Readevents;
use pairmon::out::Sink;
use pairmon::{interrupt, scripts, CliArgs};
use pairtools::acq::{Acquisition, CancelFlag, Replay};
use pairtools::cfg::Config;
use pairtools::stats::{Retry, Sampler};
use std::process;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

const GIT_VERSION: &str = git_version::git_version!();

fn main() {
    // Parse command line arguments
    let args: CliArgs = argh::from_env();

    if args.version {
        println!(
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        );
        return;
    }

    let mut quiet = args.quiet;
    if let Err(e) = run(args, &mut quiet) {
        if quiet {
            println!();
        } else {
            eprintln!("Error: {:?}", e);
        }
        process::exit(1);
    }
}

fn init_logging(config: &Config) {
    let level = if config.quiet {
        LevelFilter::OFF
    } else {
        match config.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs, quiet: &mut bool) -> Result<()> {
    let config = args.load_config()?;
    *quiet = config.quiet;

    if let Some(path) = &args.save {
        config.save(path)?;
        return Ok(());
    }
    let script = args
        .script
        .ok_or_else(|| anyhow!("no script given: pairs_once, pairs, singles, visibility or 2pairs"))?;

    init_logging(&config);
    info!(?script, "{} {}", env!("CARGO_BIN_NAME"), GIT_VERSION);

    let cancel = CancelFlag::new();
    interrupt::install(cancel.clone())?;

    let retry = Retry {
        max_attempts: config.max_attempts(),
        cancel: Some(cancel.clone()),
    };
    let acq: Box<dyn Acquisition> = match &config.replay {
        Some(path) => {
            info!("replaying {}", path.display());
            Box::new(Replay::new(path, true))
        }
        None => Box::new(Readevents::new(&config, cancel.clone())),
    };
    let sink = Sink::stdout(config.logging.clone(), !config.no_color);

    scripts::run(script, &config, Sampler::new(acq, retry), sink, cancel)
}
