//! Process signal handling.
//!
//! SIGUSR1 requests a cache reload, observed by the accept loop between
//! accepts. SIGINT (graceful terminate) is handled in `main` via
//! `tokio::signal::ctrl_c`. SIGPIPE is already ignored by the Rust runtime,
//! so a peer closing mid-write surfaces as a write error instead of killing
//! the process.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};

static RELOAD: AtomicBool = AtomicBool::new(false);

/// Installs the SIGUSR1 handler that flags a cache reload.
pub fn spawn_reload_watcher() -> Result<()> {
    let mut usr1 =
        signal(SignalKind::user_defined1()).context("reload signal initialization failed")?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            RELOAD.store(true, Ordering::Relaxed);
            tracing::info!("cache reload requested");
        }
    });
    Ok(())
}

/// True when a reload was requested since the last call; clears the flag.
pub fn take_reload_request() -> bool {
    RELOAD.swap(false, Ordering::Relaxed)
}
