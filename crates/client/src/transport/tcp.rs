//! EPP over TCP (RFC 5734)
//!
//! Each document travels as one frame: a 4-byte big-endian total length
//! followed by the XML. TLS is not built in; wrap the TCP stream with the
//! TLS library of your choice and pass it to [`TcpTransport::from_stream`].

use std::collections::VecDeque;

use super::Transport;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use eppkit_protocol::framing::{encode_frame, FrameDecoder};
use eppkit_protocol::FrameError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Framed byte-stream transport
pub struct TcpTransport<S = TcpStream> {
    stream: S,
    decoder: FrameDecoder,
}

impl TcpTransport<TcpStream> {
    /// Opens a plain TCP connection
    pub async fn connect(
        addr: impl ToSocketAddrs,
        max_frame_size: usize,
    ) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "TCP connection established");
        Ok(Self::from_stream(stream, max_frame_size))
    }
}

impl<S> TcpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Uses an already established stream (e.g. a TLS session)
    pub fn from_stream(stream: S, max_frame_size: usize) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(max_frame_size),
        }
    }
}

#[async_trait]
impl<S> Transport for TcpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Error = TcpTransportError;

    async fn run(
        self,
        incoming_tx: mpsc::Sender<Bytes>,
        mut outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error> {
        let Self { stream, decoder } = self;
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        // Decoded frames the session has not taken yet
        let mut inbound: VecDeque<Bytes> = VecDeque::new();

        loop {
            tokio::select! {
                read = reader.read_buf(&mut buf) => {
                    if read? == 0 {
                        if !buf.is_empty() {
                            tracing::warn!(buffered = buf.len(), "Connection closed mid-frame");
                        } else {
                            tracing::info!("Server closed connection");
                        }
                        // Hand over what already arrived before hanging up
                        for document in inbound {
                            if incoming_tx.send(document).await.is_err() {
                                break;
                            }
                        }
                        return Ok(());
                    }

                    while let Some(document) = decoder.decode(&mut buf)? {
                        tracing::debug!(len = document.len(), "Received frame");
                        inbound.push_back(document);
                    }
                }

                permit = incoming_tx.reserve(), if !inbound.is_empty() => match permit {
                    Ok(permit) => {
                        if let Some(document) = inbound.pop_front() {
                            permit.send(document);
                        }
                    }
                    // Session is gone
                    Err(_) => return Ok(()),
                },

                outgoing = outgoing_rx.recv() => match outgoing {
                    Some(document) => {
                        tracing::debug!(len = document.len(), "Sending frame");
                        writer.write_all(&encode_frame(&document)).await?;
                        writer.flush().await?;
                    }
                    None => {
                        let _ = writer.shutdown().await;
                        return Ok(());
                    }
                },
            }
        }
    }
}

/// TCP transport errors
#[derive(Debug, thiserror::Error)]
pub enum TcpTransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),
}
