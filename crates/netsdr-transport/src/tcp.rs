//! TCP control channel transport.
//!
//! One persistent connection to the receiver. Every read is handed to the
//! registered handler as one message; frame reassembly is left to the caller.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::traits::{HandlerSlot, MessageHandler, NetClient, TransportError};

/// Read buffer size for the receive loop.
const READ_BUFFER_SIZE: usize = 8192;

/// State shared between the transport and its receive task.
#[derive(Default)]
struct Shared {
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    handler: HandlerSlot,
}

impl Shared {
    /// Drop the write half and mark the transport disconnected.
    async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("TCP shutdown failed: {}", e);
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// A running receive loop.
struct Session {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Session {
    async fn stop(self) {
        // The loop may already have exited on its own
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("TCP receive task failed: {}", e);
        }
    }
}

/// TCP transport for the NetSDR control channel.
pub struct TcpTransport {
    addr: String,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl TcpTransport {
    /// Create a transport for `addr` (`host:port`). No connection is made until
    /// [`NetClient::connect`] is called.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            shared: Arc::new(Shared::default()),
            session: Mutex::new(None),
        }
    }

    /// Get the remote address this transport connects to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl NetClient for TcpTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut session = self.session.lock().await;

        if self.shared.connected.load(Ordering::SeqCst) {
            debug!(addr = %self.addr, "Already connected");
            return Ok(());
        }

        // Reap a loop that ended because the peer went away
        if let Some(old) = session.take() {
            old.stop().await;
        }

        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            warn!(addr = %self.addr, "TCP connect failed: {}", e);
            TransportError::Io(e)
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let (reader, writer) = stream.into_split();
        *self.shared.writer.lock().await = Some(writer);
        self.shared.connected.store(true, Ordering::SeqCst);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(read_loop(reader, shutdown_rx, Arc::clone(&self.shared)));
        *session = Some(Session {
            shutdown: shutdown_tx,
            task,
        });

        info!(addr = %self.addr, "Connected");
        Ok(())
    }

    async fn disconnect(&self) {
        let session = self.session.lock().await.take();

        if let Some(session) = session {
            session.stop().await;
            info!(addr = %self.addr, "Disconnected");
        }

        self.shared.close().await;
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let mut guard = self.shared.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(&data).await?;

        trace!(len = data.len(), "TCP message sent");
        Ok(())
    }

    fn set_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.shared.handler.set(handler);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    mut shutdown: oneshot::Receiver<()>,
    shared: Arc<Shared>,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("TCP receive loop cancelled");
                break;
            }
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("Connection closed by peer");
                    break;
                }
                Ok(n) => {
                    trace!(len = n, "TCP message received");
                    if !shared.handler.dispatch(Bytes::copy_from_slice(&buf[..n])) {
                        warn!(len = n, "No handler registered, dropping TCP message");
                    }
                }
                Err(e) => {
                    error!("TCP receive failed: {}", e);
                    break;
                }
            }
        }
    }

    shared.close().await;
}
