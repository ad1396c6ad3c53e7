//! Shutdown coordination for the proxy.

use std::future::Future;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Tasks obtain a future from [`Shutdown::wait`] that resolves once
/// [`Shutdown::trigger`] has been called, including when they start waiting
/// after the trigger.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// A future that completes when shutdown is triggered.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // Err means the coordinator was dropped; treat that as shutdown.
            let _ = rx.wait_for(|triggered| *triggered).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
