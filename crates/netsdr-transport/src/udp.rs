//! UDP streaming transport.
//!
//! Binds a local port and hands each received datagram to the registered
//! handler. The receive loop runs inside [`StreamClient::start_listening`]
//! so the caller decides which task owns it.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, info, trace, warn};

use crate::traits::{HandlerSlot, MessageHandler, StreamClient};

/// Maximum UDP datagram size.
const MAX_DATAGRAM_SIZE: usize = 65536;

/// Cancellation handle of the active receive loop.
struct Session {
    id: u64,
    shutdown: oneshot::Sender<()>,
}

/// UDP transport for the NetSDR IQ data stream.
pub struct UdpTransport {
    bind_addr: SocketAddr,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
    /// Held by a receive loop for as long as its socket is bound.
    socket_guard: AsyncMutex<()>,
    bound: AtomicBool,
    handler: HandlerSlot,
}

impl UdpTransport {
    /// Create a transport that will listen on `bind_addr` once started.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            session: Mutex::new(None),
            next_session: AtomicU64::new(0),
            socket_guard: AsyncMutex::new(()),
            bound: AtomicBool::new(false),
            handler: HandlerSlot::default(),
        }
    }

    /// Create a transport listening on all interfaces at `port`.
    #[must_use]
    pub fn on_port(port: u16) -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    /// Get the local address the transport binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear the session slot if it still belongs to loop `id`.
    fn end_session(&self, id: u64) {
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| s.id == id) {
            *session = None;
        }
    }
}

#[async_trait]
impl StreamClient for UdpTransport {
    async fn start_listening(&self) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        {
            let mut session = self.lock_session();
            if session.is_some() {
                debug!(addr = %self.bind_addr, "Already listening");
                return;
            }
            *session = Some(Session {
                id,
                shutdown: shutdown_tx,
            });
        }

        // A stopped loop may still own the port until it next runs
        let socket_guard = self.socket_guard.lock().await;

        let socket = match UdpSocket::bind(self.bind_addr).await {
            Ok(socket) => socket,
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!(addr = %self.bind_addr, "UDP port already in use");
                self.end_session(id);
                return;
            }
            Err(e) => {
                error!(addr = %self.bind_addr, "UDP bind failed: {}", e);
                self.end_session(id);
                return;
            }
        };

        self.bound.store(true, Ordering::SeqCst);
        info!(addr = %self.bind_addr, "Listening for UDP messages");
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("UDP receive loop cancelled");
                    break;
                }
                result = socket.recv_from(&mut buf) => match result {
                    Ok((n, peer)) => {
                        trace!(len = n, peer = %peer, "UDP message received");
                        if !self.handler.dispatch(Bytes::copy_from_slice(&buf[..n])) {
                            warn!(len = n, "No handler registered, dropping UDP message");
                        }
                    }
                    Err(e) => {
                        error!("UDP receive failed: {}", e);
                        break;
                    }
                }
            }
        }

        self.bound.store(false, Ordering::SeqCst);
        drop(socket);
        drop(socket_guard);
        self.end_session(id);
        info!(addr = %self.bind_addr, "Stopped listening");
    }

    fn stop_listening(&self) {
        if let Some(session) = self.lock_session().take() {
            let _ = session.shutdown.send(());
            debug!(addr = %self.bind_addr, "Stop requested");
        }
    }

    fn set_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.handler.set(handler);
    }

    fn is_listening(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }
}
