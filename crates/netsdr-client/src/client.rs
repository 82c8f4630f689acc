//! NetSDR protocol client.
//!
//! The client drives a receiver through its lifecycle:
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──start_iq──▶ Streaming
//!      ▲                      │    ▲                   │
//!      └──────disconnect──────┘    └──────stop_iq──────┘
//! ```
//!
//! Commands go out over the TCP control channel one at a time. Each command
//! waits for the next inbound TCP message as its response, or gives up after
//! the response timeout. IQ data arrives over UDP and is decoded straight
//! into a [`SampleSink`].

use bytes::Bytes;
use netsdr_protocol::{codec, samples, ControlItemCode, DecodedMessage, ProtocolError};
use netsdr_transport::{NetClient, StreamClient, TransportError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::commands;
use crate::pending::PendingSlot;
use crate::sink::SampleSink;

/// Default time to wait for a command response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default IQ sample width.
pub const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

/// How often `stop_iq` re-signals a stream task that has not armed its stop handle yet.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The control connection is not open.
    #[error("No active connection")]
    NotConnected,

    /// Message could not be encoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport failure while sending.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a command waits for its response.
    pub response_timeout: Duration,
    /// IQ output sample rate sent during setup.
    pub sample_rate_hz: u64,
    /// Width of each sample in a data item body.
    pub bits_per_sample: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            sample_rate_hz: commands::DEFAULT_SAMPLE_RATE_HZ,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        }
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Streaming,
}

/// Receives TCP messages that arrive while no command is waiting.
pub trait UnsolicitedHandler: Send + Sync {
    fn on_unsolicited(&self, data: Bytes);
}

/// Default unsolicited message handler: logs and drops the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUnsolicited;

impl UnsolicitedHandler for LogUnsolicited {
    fn on_unsolicited(&self, data: Bytes) {
        warn!(len = data.len(), bytes = %Hex(&data), "Unsolicited message received");
    }
}

/// Client for a NetSDR receiver.
pub struct ProtocolClient {
    tcp: Arc<dyn NetClient>,
    udp: Arc<dyn StreamClient>,
    config: ClientConfig,
    /// Response slot for the one command in flight.
    pending: Arc<PendingSlot>,
    /// Serializes commands; held from transmit until the response or timeout.
    command_lock: Mutex<()>,
    iq_started: AtomicBool,
    /// UDP receive loop, kept so stopping can join it.
    stream_task: Mutex<Option<JoinHandle<()>>>,
}

impl ProtocolClient {
    /// Create a client with default configuration.
    #[must_use]
    pub fn new(
        tcp: Arc<dyn NetClient>,
        udp: Arc<dyn StreamClient>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        Self::with_config(tcp, udp, sink, ClientConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// Registers the client as the message handler of both transports.
    #[must_use]
    pub fn with_config(
        tcp: Arc<dyn NetClient>,
        udp: Arc<dyn StreamClient>,
        sink: Arc<dyn SampleSink>,
        config: ClientConfig,
    ) -> Self {
        debug!("Creating protocol client with config: {:?}", config);

        let bits_per_sample = config.bits_per_sample;
        udp.set_handler(Arc::new(move |data: Bytes| {
            handle_datagram(&data, bits_per_sample, sink.as_ref());
        }));

        let client = Self {
            tcp,
            udp,
            config,
            pending: Arc::new(PendingSlot::new()),
            command_lock: Mutex::new(()),
            iq_started: AtomicBool::new(false),
            stream_task: Mutex::new(None),
        };
        client.install_tcp_handler(Arc::new(LogUnsolicited));
        client
    }

    /// Route TCP messages that are not command responses to `handler`.
    #[must_use]
    pub fn with_unsolicited_handler(self, handler: Arc<dyn UnsolicitedHandler>) -> Self {
        self.install_tcp_handler(handler);
        self
    }

    fn install_tcp_handler(&self, unsolicited: Arc<dyn UnsolicitedHandler>) {
        let pending = Arc::clone(&self.pending);
        self.tcp.set_handler(Arc::new(move |data: Bytes| {
            trace!(bytes = %Hex(&data), "TCP message received");
            if let Err(data) = pending.resolve(data) {
                unsolicited.on_unsolicited(data);
            }
        }));
    }

    /// Get the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check if the control connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tcp.is_connected()
    }

    /// Check if IQ streaming has been started on an open connection.
    #[must_use]
    pub fn iq_started(&self) -> bool {
        self.state() == ConnectionState::Streaming
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if !self.tcp.is_connected() {
            ConnectionState::Disconnected
        } else if self.iq_started.load(Ordering::SeqCst) {
            ConnectionState::Streaming
        } else {
            ConnectionState::Connected
        }
    }

    /// Connect to the receiver and run the setup sequence.
    ///
    /// Sample rate, RF filter and A/D mode are sent in that order, each only
    /// after the previous one has been answered or timed out. Does nothing if
    /// already connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or a setup command
    /// cannot be sent.
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.tcp.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        self.tcp.connect().await?;

        let setup = [
            commands::sample_rate(self.config.sample_rate_hz)?,
            commands::rf_filter_auto()?,
            commands::ad_mode()?,
        ];
        for msg in setup {
            if let Err(e) = self.send_command(msg).await {
                // Leave the transport closed so a retried connect runs setup again
                warn!("Receiver setup failed: {}", e);
                self.tcp.disconnect().await;
                return Err(e);
            }
        }

        info!("Receiver setup complete");
        Ok(())
    }

    /// Close the control connection.
    ///
    /// IQ streaming is left running; call [`ProtocolClient::stop_iq`] first
    /// or use [`ProtocolClient::shutdown`].
    pub async fn disconnect(&self) {
        self.tcp.disconnect().await;
        self.iq_started.store(false, Ordering::SeqCst);
    }

    /// Start the receiver and begin collecting IQ data.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without sending anything if the
    /// control connection is closed.
    pub async fn start_iq(&self) -> Result<(), ClientError> {
        self.require_connection()?;

        self.send_command(commands::receiver_start()?).await?;
        self.iq_started.store(true, Ordering::SeqCst);

        let mut task = self.stream_task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("IQ stream already running");
            return Ok(());
        }

        let udp = Arc::clone(&self.udp);
        *task = Some(tokio::spawn(async move { udp.start_listening().await }));

        info!("IQ streaming started");
        Ok(())
    }

    /// Stop the receiver and the IQ data stream.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without sending anything if the
    /// control connection is closed.
    pub async fn stop_iq(&self) -> Result<(), ClientError> {
        self.require_connection()?;

        self.send_command(commands::receiver_stop()?).await?;
        self.iq_started.store(false, Ordering::SeqCst);
        self.stop_stream().await;

        info!("IQ streaming stopped");
        Ok(())
    }

    /// Tune `channel` to `hz`.
    ///
    /// Frequencies are carried in 40 bits; higher bits are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn change_frequency(&self, hz: u64, channel: u8) -> Result<(), ClientError> {
        self.send_command(commands::receiver_frequency(hz, channel)?)
            .await?;
        Ok(())
    }

    /// Ask the receiver for the current value of `code`.
    ///
    /// Returns the decoded response, or `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn query_control_item(
        &self,
        code: ControlItemCode,
    ) -> Result<Option<DecodedMessage>, ClientError> {
        let response = self.send_command(commands::current_value(code)?).await?;
        Ok(response.map(|data| codec::decode(&data)))
    }

    /// Send one encoded message and wait for its response.
    ///
    /// Commands are serialized: a second caller waits until the first has its
    /// response or has timed out. Returns `Ok(None)` if no response arrives
    /// within the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected or the transport fails to send.
    pub async fn send_command(&self, msg: Bytes) -> Result<Option<Bytes>, ClientError> {
        self.require_connection()?;

        let _guard = self.command_lock.lock().await;

        let mut response = self.pending.arm();
        if let Err(e) = self.tcp.send(msg).await {
            self.pending.clear();
            return Err(e.into());
        }

        match tokio::time::timeout(self.config.response_timeout, &mut response).await {
            Ok(Ok(data)) => Ok(Some(data)),
            Ok(Err(_)) => {
                debug!("Pending request dropped before a response arrived");
                Ok(None)
            }
            Err(_) => {
                self.pending.clear();
                // The response may have landed between the timer firing and the clear
                if let Ok(data) = response.try_recv() {
                    return Ok(Some(data));
                }
                warn!(
                    timeout_ms = self.config.response_timeout.as_millis() as u64,
                    "Request timed out"
                );
                Ok(None)
            }
        }
    }

    /// Stop streaming if active and close the connection.
    pub async fn shutdown(&self) {
        self.iq_started.store(false, Ordering::SeqCst);
        self.stop_stream().await;
        self.tcp.disconnect().await;
    }

    fn require_connection(&self) -> Result<(), ClientError> {
        if self.tcp.is_connected() {
            Ok(())
        } else {
            warn!("No active connection");
            Err(ClientError::NotConnected)
        }
    }

    async fn stop_stream(&self) {
        let task = self.stream_task.lock().await.take();
        let Some(mut task) = task else {
            self.udp.stop_listening();
            return;
        };

        loop {
            self.udp.stop_listening();
            tokio::select! {
                result = &mut task => {
                    if let Err(e) = result {
                        warn!("IQ stream task failed: {}", e);
                    }
                    break;
                }
                // The task may not have registered with the transport yet
                _ = tokio::time::sleep(STOP_POLL_INTERVAL) => {}
            }
        }
    }
}

/// Decode one UDP datagram and push its samples into `sink`.
fn handle_datagram(data: &[u8], bits_per_sample: u32, sink: &dyn SampleSink) {
    let msg = codec::decode(data);

    if !msg.success {
        warn!(len = data.len(), "Malformed data item, skipping");
        return;
    }
    if !msg.msg_type.is_data_item() {
        warn!(msg_type = %msg.msg_type, "Unexpected control item on the data stream, skipping");
        return;
    }
    if msg.body.is_empty() {
        warn!(seq = msg.sequence_number, "Data item without samples, skipping");
        return;
    }

    let batch: Vec<i16> = match samples::unpack(bits_per_sample, &msg.body) {
        // Samples are narrowed to 16 bits for storage
        Ok(samples) => samples.map(|s| s as i16).collect(),
        Err(e) => {
            warn!("Cannot extract samples: {}", e);
            return;
        }
    };

    trace!(seq = msg.sequence_number, count = batch.len(), "Samples received");

    if let Err(e) = sink.append_batch(&batch) {
        error!("Failed to store samples: {}", e);
    }
}

/// Hex dump for log output.
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsdr_protocol::MessageType;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct VecSink(StdMutex<Vec<i16>>);

    impl SampleSink for VecSink {
        fn append(&self, sample: i16) -> std::io::Result<()> {
            self.0.lock().unwrap().push(sample);
            Ok(())
        }
    }

    fn data_item(seq: u16, body: &[u8]) -> Bytes {
        let mut payload = seq.to_le_bytes().to_vec();
        payload.extend_from_slice(body);
        codec::encode_data_item(MessageType::DataItem0, &payload).unwrap()
    }

    #[test]
    fn test_handle_datagram_appends_samples() {
        let sink = VecSink::default();
        handle_datagram(&data_item(7, &[0x01, 0x00, 0xFF, 0xFF]), 16, &sink);
        assert_eq!(*sink.0.lock().unwrap(), vec![1, -1]);
    }

    #[test]
    fn test_handle_datagram_skips_bad_input() {
        let sink = VecSink::default();

        // Empty body
        handle_datagram(&data_item(1, &[]), 16, &sink);
        // Truncated
        let msg = data_item(2, &[0x01, 0x00]);
        handle_datagram(&msg[..msg.len() - 1], 16, &sink);
        // Control item on the data stream
        let ctrl = codec::encode_control_item(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &[0x01, 0x00],
        )
        .unwrap();
        handle_datagram(&ctrl, 16, &sink);
        // Unsupported sample width
        handle_datagram(&data_item(3, &[0x01, 0x00]), 40, &sink);

        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(Hex(&[0x0a, 0xff, 0x00]).to_string(), "0a ff 00");
        assert_eq!(Hex(&[]).to_string(), "");
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.response_timeout, Duration::from_secs(5));
        assert_eq!(config.sample_rate_hz, 100_000);
        assert_eq!(config.bits_per_sample, 16);
    }
}
