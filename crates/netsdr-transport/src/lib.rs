//! # netsdr-transport
//!
//! Transport layer for talking to a NetSDR receiver.
//!
//! - **TCP** - the persistent control channel ([`TcpTransport`])
//! - **UDP** - the IQ data stream ([`UdpTransport`])
//!
//! ## Transport Abstraction
//!
//! Transports implement the [`NetClient`] and [`StreamClient`] traits so the
//! protocol client can be tested against in-memory doubles.
//!
//! ```rust,ignore
//! use netsdr_transport::{NetClient, TcpTransport};
//! use std::sync::Arc;
//!
//! let tcp = TcpTransport::new("192.168.1.50:50000");
//! tcp.set_handler(Arc::new(|data: bytes::Bytes| println!("{} bytes", data.len())));
//! tcp.connect().await?;
//! ```

pub mod tcp;
pub mod traits;
pub mod udp;

pub use tcp::TcpTransport;
pub use traits::{MessageHandler, NetClient, StreamClient, TransportError};
pub use udp::UdpTransport;
