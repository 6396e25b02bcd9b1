//! In-memory transport for testing and embedding
//!
//! This transport uses Tokio channels instead of network sockets,
//! making it useful for:
//! - Unit testing sessions and pools without network overhead
//! - Scripted EPP responders running in the same process
//!
//! Documents pass through unframed: each channel message is one complete
//! XML document.

use std::collections::VecDeque;

use super::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// In-memory transport that communicates via channels
///
/// # Example
///
/// ```no_run
/// use eppkit_client::transport::memory::MemoryTransport;
/// use tokio::sync::mpsc;
///
/// let (to_peer_tx, to_peer_rx) = mpsc::channel(100);
/// let (from_peer_tx, from_peer_rx) = mpsc::channel(100);
///
/// let transport = MemoryTransport::new(to_peer_tx, from_peer_rx);
/// ```
pub struct MemoryTransport {
    /// Channel to send documents to the peer
    to_peer: mpsc::Sender<Bytes>,
    /// Channel to receive documents from the peer
    from_peer: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    /// Creates a new in-memory transport
    ///
    /// # Arguments
    /// * `to_peer` - Channel to send documents to the other side
    /// * `from_peer` - Channel to receive documents from the other side
    pub fn new(to_peer: mpsc::Sender<Bytes>, from_peer: mpsc::Receiver<Bytes>) -> Self {
        Self { to_peer, from_peer }
    }

    /// Creates a pair of connected transports for client and server
    ///
    /// # Returns
    /// A tuple of (client_transport, server_transport)
    ///
    /// # Example
    ///
    /// ```
    /// use eppkit_client::transport::memory::MemoryTransport;
    ///
    /// let (client_transport, server_transport) = MemoryTransport::create_pair(100);
    /// ```
    pub fn create_pair(buffer_size: usize) -> (Self, Self) {
        let (client_to_server_tx, client_to_server_rx) = mpsc::channel(buffer_size);
        let (server_to_client_tx, server_to_client_rx) = mpsc::channel(buffer_size);

        let client_transport = Self::new(client_to_server_tx, server_to_client_rx);
        let server_transport = Self::new(server_to_client_tx, client_to_server_rx);

        (client_transport, server_transport)
    }

    /// Splits into the raw channels, for peers that drive them directly
    pub fn into_parts(self) -> (mpsc::Sender<Bytes>, mpsc::Receiver<Bytes>) {
        (self.to_peer, self.from_peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    async fn run(
        self,
        incoming_tx: mpsc::Sender<Bytes>,
        mut outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error> {
        let Self {
            to_peer,
            mut from_peer,
        } = self;
        // Documents accepted from one side but not yet taken by the other
        let mut inbound: VecDeque<Bytes> = VecDeque::new();
        let mut outbound: VecDeque<Bytes> = VecDeque::new();

        loop {
            tokio::select! {
                // Receive from peer, queue for session
                document = from_peer.recv() => match document {
                    Some(document) => inbound.push_back(document),
                    // Peer hung up; dropping incoming_tx tells the session
                    None => {
                        for document in inbound {
                            if incoming_tx.send(document).await.is_err() {
                                break;
                            }
                        }
                        return Ok(());
                    }
                },

                permit = incoming_tx.reserve(), if !inbound.is_empty() => match permit {
                    Ok(permit) => {
                        if let Some(document) = inbound.pop_front() {
                            permit.send(document);
                        }
                    }
                    Err(_) => return Err(MemoryTransportError::ChannelClosed),
                },

                // Receive from session, queue for peer
                document = outgoing_rx.recv() => match document {
                    Some(document) => outbound.push_back(document),
                    None => return Ok(()),
                },

                permit = to_peer.reserve(), if !outbound.is_empty() => match permit {
                    Ok(permit) => {
                        if let Some(document) = outbound.pop_front() {
                            permit.send(document);
                        }
                    }
                    Err(_) => return Err(MemoryTransportError::ChannelClosed),
                },
            }
        }
    }
}

/// Memory transport errors
#[derive(Debug, thiserror::Error)]
pub enum MemoryTransportError {
    #[error("Transport channel closed")]
    ChannelClosed,
}
