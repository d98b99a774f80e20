//! Stop signal for background watchers.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-way stop flag shared by every watcher spawned from the same owner.
///
/// Once triggered it stays triggered: watchers already running stop, and
/// watchers started afterwards return on their first check.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        // A `Notified` receives `notify_waiters` from the moment it exists,
        // so creating it before the flag check leaves no gap.
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}
