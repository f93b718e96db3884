//! The timestamp card, driven through the `readevents` capture binary.
//!
//! The capture is stopped with `Child::kill` (SIGKILL on unix), so output
//! still buffered in `readevents` is lost and the recorded span comes out
//! slightly shorter than the requested duration.

use pairtools::acq::{Acquisition, CancelFlag};
use pairtools::cfg::Config;
use pairtools::{de, Error, Event, Result};
use std::cmp;
use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Granularity of cancellation checks while recording
const POLL: Duration = Duration::from_millis(50);

pub struct Readevents {
    pub device: PathBuf,
    pub readevents: PathBuf,
    /// Raw capture output, overwritten on every trigger
    pub tmpfile: PathBuf,
    cancel: CancelFlag,
}

impl Readevents {
    pub fn new(config: &Config, cancel: CancelFlag) -> Self {
        Readevents {
            device: config.device.clone(),
            readevents: config.readevents.clone(),
            tmpfile: config.tmpfile.clone(),
            cancel,
        }
    }

    fn spawn(&self) -> Result<Child> {
        let out = File::create(&self.tmpfile)?;
        Command::new(&self.readevents)
            .arg("-U")
            .arg(&self.device)
            .args(["-a1", "-X"])
            .stdin(Stdio::null())
            .stdout(out)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Acquisition(format!("{}: {}", self.readevents.display(), e)))
    }

    /// Let the capture run for `duration`, unless it dies or is cancelled
    fn record(&self, child: &mut Child, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.cancel.check()?;
            if let Some(status) = child.try_wait()? {
                return Err(Error::Acquisition(format!(
                    "{} exited before the end of the integration time ({})",
                    self.readevents.display(),
                    status
                )));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(cmp::min(deadline - now, POLL));
        }
    }
}

impl Acquisition for Readevents {
    fn trigger(&mut self, duration: f64) -> Result<Vec<Event>> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::InvalidDuration(duration));
        }
        let mut child = self.spawn()?;
        debug!(pid = child.id(), duration, "capture started");
        let recorded = self.record(&mut child, Duration::from_secs_f64(duration));
        // The capture may have exited already
        let _ = child.kill();
        let _ = child.wait();
        recorded?;

        let events = de::a1(File::open(&self.tmpfile)?, true)?;
        debug!(events = events.len(), "capture read");
        Ok(events)
    }
}
