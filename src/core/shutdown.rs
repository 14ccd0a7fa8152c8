//! Cooperative cancellation for the engine loops

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

/// Cloneable stop signal handed to each engine run.
///
/// Engines poll `is_shutting_down` at their loop boundaries and wait through
/// `sleep`, which returns early once shutdown is initiated.
#[derive(Debug, Clone)]
pub struct GracefulShutdown {
    sender: std::sync::Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: std::sync::Arc::new(sender),
            receiver,
        }
    }

    pub fn initiate_shutdown(&self) {
        if !self.is_shutting_down() {
            info!("🛑 Graceful shutdown initiated");
        }
        self.sender.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been initiated
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of self, so this only errors
        // if every handle is gone, in which case nobody is left to cancel.
        let _ = receiver.wait_for(|stopped| *stopped).await;
    }

    /// Sleep for `duration` unless shutdown comes first.
    ///
    /// Returns `true` when the sleep was cut short by shutdown.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_shutting_down() {
            return true;
        }
        tokio::select! {
            _ = sleep(duration) => false,
            _ = self.wait() => true,
        }
    }

    /// Trigger shutdown on Ctrl-C
    pub fn listen_for_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("⚠️  Interrupt received, stopping...");
                    shutdown.initiate_shutdown();
                }
                Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
            }
        });
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
