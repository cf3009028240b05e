// ============================================================
// Layer 6 — Interrupt Handling
// ============================================================
// Ctrl-C (SIGINT) ends the process immediately with status 0.
// Nothing is flushed or cleaned up: a checkpoint being written
// at that moment may be left truncated, and the epoch that was
// running gets no checkpoint at all.

use anyhow::{anyhow, Result};
use std::sync::Mutex;

static INSTALLED: Mutex<bool> = Mutex::new(false);

/// Install the process-wide handler. Later calls are no-ops.
pub fn install_exit_on_interrupt() -> Result<()> {
    install_once(&INSTALLED, || {
        ctrlc::set_handler(|| {
            eprintln!("\nInterrupted, exiting.");
            std::process::exit(0);
        })
    })
}

/// Run `install` unless it already succeeded. The flag is only
/// set once `install` returns Ok, so a failed attempt can be retried.
fn install_once<F>(installed: &Mutex<bool>, install: F) -> Result<()>
where
    F: FnOnce() -> Result<(), ctrlc::Error>,
{
    let mut done = installed
        .lock()
        .map_err(|_| anyhow!("interrupt handler state poisoned"))?;
    if *done {
        return Ok(());
    }
    install().map_err(|e| anyhow!("Failed to set Ctrl-C handler: {e}"))?;
    *done = true;
    tracing::debug!("Interrupt handler installed");
    Ok(())
}
