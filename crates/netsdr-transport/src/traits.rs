//! Transport abstraction traits for NetSDR.
//!
//! The client talks to the receiver through two capabilities: a persistent
//! control connection ([`NetClient`]) and a datagram stream ([`StreamClient`]).
//! Each delivers inbound data to a single registered [`MessageHandler`].

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation requires an open connection.
    #[error("Not connected to a server")]
    NotConnected,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Consumer of inbound messages.
///
/// Handlers run on the transport's receive task, one read at a time, so they
/// should not block for long.
pub trait MessageHandler: Send + Sync {
    /// Called once per successful read.
    fn on_message(&self, data: Bytes);
}

impl<F> MessageHandler for F
where
    F: Fn(Bytes) + Send + Sync,
{
    fn on_message(&self, data: Bytes) {
        self(data);
    }
}

/// A persistent, connection-oriented control channel.
#[async_trait]
pub trait NetClient: Send + Sync {
    /// Open the connection and start receiving. Does nothing if already connected.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection. Safe to call when not connected.
    async fn disconnect(&self);

    /// Send raw bytes over the connection.
    async fn send(&self, data: Bytes) -> Result<(), TransportError>;

    /// Register the handler for inbound data, replacing any previous one.
    fn set_handler(&self, handler: Arc<dyn MessageHandler>);

    /// Check if the connection is open.
    fn is_connected(&self) -> bool;
}

/// A datagram stream receiver.
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Run the receive loop until [`StreamClient::stop_listening`] is called
    /// or the socket fails.
    ///
    /// Returns immediately if a loop is already running. Socket errors end the
    /// loop and are logged rather than returned.
    async fn start_listening(&self);

    /// Signal the receive loop to stop. Safe to call when not listening.
    fn stop_listening(&self);

    /// Register the handler for inbound datagrams, replacing any previous one.
    fn set_handler(&self, handler: Arc<dyn MessageHandler>);

    /// Check if a receive loop is running with its socket bound.
    ///
    /// Stays false while a started loop is still binding, and after a bind
    /// failure.
    fn is_listening(&self) -> bool;
}

/// Slot holding the single registered handler of a transport.
#[derive(Default)]
pub(crate) struct HandlerSlot {
    inner: RwLock<Option<Arc<dyn MessageHandler>>>,
}

impl HandlerSlot {
    pub(crate) fn set(&self, handler: Arc<dyn MessageHandler>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(handler);
    }

    /// Deliver `data` to the handler. Returns `false` if none is registered.
    pub(crate) fn dispatch(&self, data: Bytes) -> bool {
        let handler = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match handler {
            Some(h) => {
                h.on_message(data);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_handler_slot_dispatch() {
        let slot = HandlerSlot::default();
        assert!(!slot.dispatch(Bytes::from_static(b"dropped")));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        slot.set(Arc::new(move |data: Bytes| sink.lock().unwrap().push(data)));

        assert!(slot.dispatch(Bytes::from_static(b"hello")));
        assert_eq!(received.lock().unwrap().as_slice(), &[Bytes::from_static(b"hello")]);
    }

    #[test]
    fn test_handler_replaced() {
        let slot = HandlerSlot::default();
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));

        let f = Arc::clone(&first);
        slot.set(Arc::new(move |_: Bytes| *f.lock().unwrap() += 1));
        let s = Arc::clone(&second);
        slot.set(Arc::new(move |_: Bytes| *s.lock().unwrap() += 1));

        slot.dispatch(Bytes::new());
        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }
}
