//! Run control: a shared shutdown flag for orderly drain on interrupt.
//!
//! The scheduler checks the flag before dispatching each job. Once tripped,
//! no new work is started; in-flight jobs run to completion and are joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable shutdown token shared between the interrupt watcher and the
/// scheduler's dispatch loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an orderly drain; safe to call from any thread or task.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Spawn a Ctrl-C watcher that trips the flag. The first interrupt stops new
/// dispatch; the process exits once the pool has drained.
pub fn install_interrupt_handler(flag: ShutdownFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; finishing in-flight jobs");
            flag.trigger();
        }
    });
}
