//! # netsdr-client
//!
//! Protocol client for NetSDR software-defined radio receivers.
//!
//! This crate ties the wire codec and the transports together:
//!
//! - **ProtocolClient** - connection setup, control commands, IQ streaming
//! - **PendingSlot** - correlates each command with its single response
//! - **Commands** - control item payloads sent to the receiver
//! - **SampleSink** - destination for decoded IQ samples
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────┐
//!                 │ ProtocolClient │
//!                 └────────────────┘
//!                   │            │
//!          commands ▼            ▼ IQ data
//!          ┌──────────────┐  ┌──────────────┐     ┌────────────┐
//!          │ TcpTransport │  │ UdpTransport │────▶│ SampleSink │
//!          └──────────────┘  └──────────────┘     └────────────┘
//! ```

pub mod client;
pub mod commands;
pub mod pending;
pub mod sink;

pub use client::{
    ClientConfig, ClientError, ConnectionState, LogUnsolicited, ProtocolClient,
    UnsolicitedHandler,
};
pub use pending::PendingSlot;
pub use sink::{FileSampleSink, SampleSink};
