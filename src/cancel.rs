//! Cooperative cancellation for in-flight extraction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cancellation signal.
///
/// Every clone observes the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<Inner>,
}

impl CancellationFlag {
    /// Create a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancellation has been signalled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve when cancellation is signalled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a cancel between the two is not lost.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(clone.check().is_ok());
        flag.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let flag = CancellationFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let flag = CancellationFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(100), flag.cancelled())
            .await
            .unwrap();
    }
}
