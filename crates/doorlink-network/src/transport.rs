//! UDP transport carrying doorlink protocol lines.
//!
//! A [`UdpTransport`] owns one bound socket. All methods take `&self`, so a
//! transport behind an `Arc` can be read by one task while others send from
//! it; the hub relies on this to send COMMANDs from the socket its receive
//! loop listens on.
//!
//! Decoding uses [`DoorCodec`], so unusable lines inside a datagram are
//! skipped and a datagram may yield zero messages.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use doorlink_core::constants::MAX_DATAGRAM_SIZE;
use doorlink_protocol::{DoorCodec, Message};

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Local address could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Datagram could not be sent
    #[error("Failed to send to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Socket read failed
    #[error("Receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Protocol-level error from DoorCodec
    #[error("Protocol error: {0}")]
    Protocol(#[from] doorlink_core::Error),
}

impl TransportError {
    /// Whether the error concerns a single datagram and the socket is still
    /// usable.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Protocol(_) => true,
            TransportError::Send { source, .. } | TransportError::Receive(source) => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
            ),
            TransportError::Bind { .. } => false,
        }
    }
}

/// One received datagram and the messages decoded from it.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// Sender address
    pub from: SocketAddr,

    /// Usable lines, in arrival order
    pub messages: Vec<Message>,
}

/// Bound UDP endpoint speaking the doorlink line protocol.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    codec: DoorCodec,
}

impl UdpTransport {
    /// Bind a transport to `addr`. Port 0 picks an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Bind` if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(
            addr = %socket.local_addr().unwrap_or(addr),
            "UDP transport bound"
        );

        Ok(Self {
            socket,
            codec: DoorCodec::new(),
        })
    }

    /// Replace the codec used for encoding and decoding.
    pub fn with_codec(mut self, codec: DoorCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Encode `message` and send it as one datagram.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Protocol` if the line is too long and
    /// `TransportError::Send` if the socket rejected the datagram.
    pub async fn send_to(&self, message: &Message, dest: SocketAddr) -> Result<(), TransportError> {
        let payload = self.codec.clone().encode_datagram(message)?;

        self.socket
            .send_to(&payload, dest)
            .await
            .map_err(|source| TransportError::Send { dest, source })?;

        trace!(%dest, line = %message, "Sent");
        Ok(())
    }

    /// Wait for the next datagram.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Receive` on socket errors and
    /// `TransportError::Protocol` if the datagram held an oversized line.
    pub async fn recv(&self) -> Result<Datagram, TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(TransportError::Receive)?;

        self.decode(&buf[..len], from)
    }

    /// Wait up to `timeout` for the next datagram; `Ok(None)` on timeout.
    ///
    /// # Errors
    ///
    /// Same as [`recv`](Self::recv).
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>, TransportError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Take a datagram that is already queued, without waiting.
    ///
    /// # Errors
    ///
    /// Same as [`recv`](Self::recv).
    pub fn try_recv(&self) -> Result<Option<Datagram>, TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, from)) => self.decode(&buf[..len], from).map(Some),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Receive(e)),
        }
    }

    fn decode(&self, bytes: &[u8], from: SocketAddr) -> Result<Datagram, TransportError> {
        let messages = self.codec.clone().decode_datagram(bytes)?;
        if messages.is_empty() {
            debug!(%from, len = bytes.len(), "Datagram held no usable lines");
        }
        Ok(Datagram { from, messages })
    }
}
