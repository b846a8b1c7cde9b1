//! Cooperative stop flag for the tick loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloned into whoever may end the run; the loop polls it between ticks.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stops on the first Ctrl-C. Needs a running tokio runtime.
    pub fn stop_on_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, finishing the current tick");
                signal.stop();
            }
        });
    }
}
