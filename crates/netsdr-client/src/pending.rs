//! Single-slot mailbox correlating a command with its response.

use bytes::Bytes;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Holds the sender half of the one outstanding request, if any.
///
/// The command path arms the slot; the TCP receive task resolves it. Both go
/// through the mutex so a response can never be delivered twice or to a
/// request that has already given up.
#[derive(Debug, Default)]
pub struct PendingSlot {
    inner: Mutex<Option<oneshot::Sender<Bytes>>>,
}

impl PendingSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot and return the receiver for the response.
    ///
    /// Any previously armed request is dropped; callers serialize commands so
    /// this only replaces a request that was already abandoned.
    pub fn arm(&self) -> oneshot::Receiver<Bytes> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(tx);
        rx
    }

    /// Hand `data` to the pending request and clear the slot.
    ///
    /// Returns the data back if nothing was waiting for it.
    pub fn resolve(&self, data: Bytes) -> Result<(), Bytes> {
        let sender = self.lock().take();
        match sender {
            Some(tx) => tx.send(data),
            None => Err(data),
        }
    }

    /// Clear the slot without resolving it.
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Check if a request is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<Bytes>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_delivers_once() {
        let slot = PendingSlot::new();
        let rx = slot.arm();
        assert!(slot.is_pending());

        assert!(slot.resolve(Bytes::from_static(b"first")).is_ok());
        assert!(!slot.is_pending());
        assert_eq!(rx.await.unwrap(), Bytes::from_static(b"first"));

        // Nothing armed: data comes back to the caller
        let returned = slot.resolve(Bytes::from_static(b"second")).unwrap_err();
        assert_eq!(returned, Bytes::from_static(b"second"));
    }

    #[test]
    fn test_resolve_after_receiver_dropped() {
        let slot = PendingSlot::new();
        drop(slot.arm());

        assert!(slot.resolve(Bytes::from_static(b"late")).is_err());
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_clear() {
        let slot = PendingSlot::new();
        let mut rx = slot.arm();
        slot.clear();

        assert!(!slot.is_pending());
        assert!(rx.try_recv().is_err());
    }
}
