//! Readiness gate: a one-shot latch the display opens once it can draw.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable one-shot latch.
///
/// Starts closed. `open()` releases every current and future `wait()`;
/// it never closes again.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        ReadyGate::new()
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        ReadyGate { tx: Arc::new(tx) }
    }

    /// Opens the gate. Idempotent.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the gate is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once open.
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_blocks_until_open() {
        let gate = ReadyGate::new();
        assert!(!gate.is_open());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        gate.open();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn test_wait_after_open_returns_immediately() {
        let gate = ReadyGate::new();
        gate.open();
        gate.open();

        tokio::time::timeout(Duration::from_millis(100), gate.wait())
            .await
            .unwrap();
    }
}
