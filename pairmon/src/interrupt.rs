//! Ctrl-C handling.
//!
//! The first interrupt raises the cancel flag so the monitor can wind down
//! after the current step; a second one exits immediately.

use anyhow::Result;
use pairtools::acq::CancelFlag;
use std::process;
use std::thread;
use tokio::runtime::Builder;
use tokio::signal;
use tracing::{info, warn};

/// Exit status after a forced second interrupt
pub const EXIT_INTERRUPTED: i32 = 130;

pub fn install(cancel: CancelFlag) -> Result<thread::JoinHandle<()>> {
    let rt = Builder::new_current_thread().enable_all().build()?;
    let handle = thread::spawn(move || {
        rt.block_on(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!("cannot listen for interrupts: {}", e);
                return;
            }
            info!("interrupted, stopping after the current measurement");
            cancel.cancel();
            if signal::ctrl_c().await.is_ok() {
                process::exit(EXIT_INTERRUPTED);
            }
        })
    });
    Ok(handle)
}
