//! Process-wide shutdown signal.
//!
//! A [`Shutdown`] handle is created once at startup and cloned into every
//! party that may request or observe termination: the OS signal listener,
//! the [`App`](crate::App) (handlers request drain by returning
//! [`Error::shutdown`](crate::Error::shutdown)), and the server accept loop.
//!
//! The handle wraps a `tokio::sync::watch` channel. Any clone may call
//! [`signal`](Shutdown::signal) any number of times from any task; the first
//! call wins and the rest are no-ops. There is no way to un-signal.

use tokio::sync::watch;

/// One-shot, many-writer shutdown signal.
///
/// Cheap to clone; all clones observe the same signal.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Requests shutdown. Idempotent; never blocks.
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_signaled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when shutdown is requested. Resolves immediately if it
    /// already was.
    pub async fn signaled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|signaled| *signaled).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
