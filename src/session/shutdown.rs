//! Cooperative shutdown signal shared by session activities.

use std::sync::Arc;

use tokio::sync::watch;

/// Clonable shutdown flag.
///
/// Any clone can trigger it; every clone observes it. Loops check
/// [`is_triggered`](Self::is_triggered) at their head or await
/// [`wait_triggered`](Self::wait_triggered) inside a `select!`.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    trigger: Arc<watch::Sender<bool>>,
    observer: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Create a token in the not-triggered state.
    pub fn new() -> Self {
        let (trigger, observer) = watch::channel(false);
        Self {
            trigger: Arc::new(trigger),
            observer,
        }
    }

    /// Flip the flag. Idempotent.
    pub fn trigger(&self) {
        let _ = self.trigger.send(true);
    }

    /// `true` once any clone has triggered shutdown.
    pub fn is_triggered(&self) -> bool {
        *self.observer.borrow()
    }

    /// Resolve once shutdown is triggered. Cancellation safe.
    pub async fn wait_triggered(&mut self) {
        while !*self.observer.borrow_and_update() {
            if self.observer.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_observed_by_clone() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_triggered());

        token.trigger();
        assert!(clone.is_triggered());

        // Triggering twice is harmless.
        clone.trigger();
        assert!(token.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_trigger() {
        let token = ShutdownToken::new();
        let mut waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.wait_triggered().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.trigger();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should resolve after trigger")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_resolves_when_already_triggered() {
        let token = ShutdownToken::new();
        token.trigger();

        let mut waiter = token.clone();
        tokio::time::timeout(Duration::from_millis(100), waiter.wait_triggered())
            .await
            .expect("wait on a triggered token resolves immediately");
    }
}
