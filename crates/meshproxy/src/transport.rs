//! # Transport Abstraction
//!
//! One request out, one reply back.
//!
//! - **Byte-Oriented**: a transport never looks inside the payload. Envelopes and
//!   structs are the dispatcher's business.
//! - **One Exchange, One Connection**: [`DealerTransport`] opens a fresh socket per
//!   call and drops it when the call resolves, whichever way it resolves.
//! - **Two Phases**: [`Transport::send`] connects and flushes the request;
//!   [`PendingReply::recv`] waits for the answer. The session times them separately.

use std::fmt;

use bytes::Bytes;
use tracing::debug;
use zeromq::DealerSocket;
use zeromq::util::PeerIdentity;
use zeromq::Socket;
use zeromq::SocketOptions;
use zeromq::SocketRecv;
use zeromq::SocketSend;
use zeromq::ZmqError;
use zeromq::ZmqMessage;

use crate::endpoint::Endpoint;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established in time.
    Connect(String),
    /// The peer did not complete the ZeroMQ handshake.
    Handshake(String),
    /// The socket layer rejected a message or the reply was malformed.
    Protocol(String),
    /// The peer closed the connection before replying.
    ConnectionLost(String),
    /// Generic I/O error.
    Io(String),
    /// No reply before the exchange deadline.
    Timeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "Connect failed: {}", msg),
            Self::Handshake(msg) => write!(f, "Handshake failed: {}", msg),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => Self::ConnectionLost(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

impl From<ZmqError> for TransportError {
    fn from(e: ZmqError) -> Self {
        match e {
            ZmqError::Network(io) => io.into(),
            other => Self::Protocol(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Everything a transport needs to deliver one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub endpoint: Endpoint,
    /// Our dealer identity, announced during the handshake.
    pub sender_identity: String,
    /// Application inside the backend that handles the request.
    pub receiver_identity: String,
    /// Node to relay through. Empty addresses the backend itself.
    pub minion_identity: String,
    /// Encoded envelope.
    pub payload: Vec<u8>,
}

/// A mechanism to send one request and receive its reply.
///
/// Object safe, shared as `Arc<dyn Transport>`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connects and flushes the request. The returned reply owns the connection.
    ///
    /// # invariants
    /// - Must not return before the request is handed to the network.
    /// - Should not interpret the payload content.
    async fn send(&self, exchange: &Exchange) -> Result<Box<dyn PendingReply>>;
}

/// The receiving half of one exchange.
#[async_trait::async_trait]
pub trait PendingReply: Send {
    /// Waits for the reply payload.
    ///
    /// # invariants
    /// - Resolves at most once; consuming `self` releases the connection.
    async fn recv(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Production transport: a ZeroMQ dealer socket over TCP.
#[derive(Debug, Default, Clone)]
pub struct DealerTransport;

impl DealerTransport {
    pub fn new() -> Self {
        Self
    }
}

fn frame(bytes: &[u8]) -> Bytes {
    Bytes::copy_from_slice(bytes)
}

#[async_trait::async_trait]
impl Transport for DealerTransport {
    async fn send(&self, exchange: &Exchange) -> Result<Box<dyn PendingReply>> {
        let identity = PeerIdentity::try_from(exchange.sender_identity.as_bytes().to_vec())
            .map_err(|e| TransportError::Handshake(format!("bad identity {}: {}", exchange.sender_identity, e)))?;
        let mut options = SocketOptions::default();
        options.peer_identity(identity);

        let mut socket = DealerSocket::with_options(options);
        socket
            .connect(&format!("tcp://{}", exchange.endpoint))
            .await
            .map_err(|e| match e {
                ZmqError::Network(io) => TransportError::Connect(format!("{}: {}", exchange.endpoint, io)),
                other => TransportError::Handshake(format!("{}: {}", exchange.endpoint, other)),
            })?;
        debug!(endpoint = %exchange.endpoint, sender = %exchange.sender_identity, "dealer connected");

        let mut message = ZmqMessage::from(frame(exchange.minion_identity.as_bytes()));
        message.push_back(frame(exchange.receiver_identity.as_bytes()));
        message.push_back(frame(exchange.sender_identity.as_bytes()));
        message.push_back(frame(&exchange.payload));
        socket.send(message).await?;

        Ok(Box::new(DealerReply { socket }))
    }
}

/// A connected dealer waiting for its one reply.
struct DealerReply {
    socket: DealerSocket,
}

#[async_trait::async_trait]
impl PendingReply for DealerReply {
    async fn recv(self: Box<Self>) -> Result<Vec<u8>> {
        let DealerReply { mut socket } = *self;
        let reply = socket.recv().await?;

        // routing frames come first, the payload is always last
        let mut frames = reply.into_vec();
        frames
            .pop()
            .map(|payload| payload.to_vec())
            .ok_or_else(|| TransportError::Protocol("empty reply message".into()))
    }
}
