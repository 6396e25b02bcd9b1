//! Transports a session can run over
//!
//! - [`tcp::TcpTransport`]: RFC 5734 framing over a TCP (or caller-supplied TLS) stream
//! - [`memory::MemoryTransport`]: in-process channel pair for tests and embedding

pub mod memory;
pub mod tcp;

pub use eppkit_protocol::transport::Transport;
pub use memory::{MemoryTransport, MemoryTransportError};
pub use tcp::{TcpTransport, TcpTransportError};
