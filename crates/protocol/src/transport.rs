//! Transport layer abstraction
//!
//! A transport moves whole EPP documents between the session and the
//! server. Framing (RFC 5734 length headers, TLS, ...) is the transport's
//! business; the session only ever sees complete XML documents as
//! [`Bytes`].

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Transport layer abstraction for network communication
///
/// # Example: Implementing a custom transport
///
/// ```no_run
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use eppkit_protocol::transport::Transport;
/// use tokio::sync::mpsc;
///
/// struct LoopbackTransport;
///
/// #[async_trait]
/// impl Transport for LoopbackTransport {
///     type Error = std::io::Error;
///
///     async fn run(
///         self,
///         incoming_tx: mpsc::Sender<Bytes>,
///         mut outgoing_rx: mpsc::Receiver<Bytes>,
///     ) -> Result<(), Self::Error> {
///         while let Some(document) = outgoing_rx.recv().await {
///             if incoming_tx.send(document).await.is_err() {
///                 break;
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + 'static {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the transport, bridging document channels
    ///
    /// Runs a loop that:
    /// - reads frames from the connection and forwards each complete
    ///   document to `incoming_tx`
    /// - takes documents from `outgoing_rx`, frames them and writes them
    ///   to the connection
    ///
    /// Returning (with or without an error) drops `incoming_tx`, which the
    /// session observes as a closed connection.
    async fn run(
        self,
        incoming_tx: mpsc::Sender<Bytes>,
        outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error>;
}
