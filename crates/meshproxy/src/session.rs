//! # Session
//!
//! One request/response exchange with one backend. A session owns the pending
//! exchange for its whole life and resolves exactly once: with the reply, with
//! the transport's error, or with [`TransportError::Timeout`] when the deadline
//! passes first. Dropping the losing future closes the socket.
//!
//! The reply deadline starts once the request is flushed. Connecting and
//! flushing get their own budget of the same length; a backend that cannot be
//! reached within it fails with [`TransportError::Connect`].

use std::sync::Arc;
use std::time::Duration;

use meshwire::MessageType;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::transport;
use crate::transport::Exchange;
use crate::transport::Transport;
use crate::transport::TransportError;

/// Dealer identity for one exchange: the app prefix plus a random suffix.
pub fn sender_identity(app: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{}-{}", app, suffix)
}

/// The in-flight half of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub sender_identity: String,
    pub expected_response: MessageType,
    /// Budget for the connect phase and, separately, for the reply after flush.
    pub timeout: Duration,
}

pub struct Session {
    transport: Arc<dyn Transport>,
    exchange: Exchange,
    pending: PendingExchange,
}

impl Session {
    pub fn new(
        transport: Arc<dyn Transport>,
        exchange: Exchange,
        expected_response: MessageType,
        timeout: Duration,
    ) -> Self {
        let pending = PendingExchange {
            sender_identity: exchange.sender_identity.clone(),
            expected_response,
            timeout,
        };
        Self { transport, exchange, pending }
    }

    pub fn pending(&self) -> &PendingExchange {
        &self.pending
    }

    /// Runs the exchange to its single outcome.
    pub async fn run(self) -> transport::Result<Vec<u8>> {
        let Session { transport, exchange, pending } = self;

        let reply = match tokio::time::timeout(pending.timeout, transport.send(&exchange)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(endpoint = %exchange.endpoint, error = %e, "exchange failed before flush");
                return Err(e);
            }
            Err(_) => {
                warn!(endpoint = %exchange.endpoint, "endpoint unreachable");
                return Err(TransportError::Connect(format!(
                    "{} unreachable within {} ms",
                    exchange.endpoint,
                    pending.timeout.as_millis()
                )));
            }
        };

        let deadline = Instant::now() + pending.timeout;
        match tokio::time::timeout_at(deadline, reply.recv()).await {
            Ok(Ok(reply)) => {
                debug!(
                    endpoint = %exchange.endpoint,
                    sender = %pending.sender_identity,
                    expected = %pending.expected_response,
                    bytes = reply.len(),
                    "exchange complete"
                );
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!(endpoint = %exchange.endpoint, error = %e, "exchange failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    endpoint = %exchange.endpoint,
                    expected = %pending.expected_response,
                    "exchange timed out"
                );
                Err(TransportError::Timeout)
            }
        }
    }
}
