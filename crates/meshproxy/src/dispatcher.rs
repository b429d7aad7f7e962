//! # RPC Dispatcher
//!
//! Turns a request into exactly one outcome: route it, open a session, decode
//! the reply, and fold acknowledgements into success or rejection.
//!
//! Two entry points:
//! - [`Dispatcher::send_request`]: fire-and-collect for polls. Never fails; the
//!   outcome, failures included, comes back as a [`RequestEvent`].
//! - [`Dispatcher::send_command`] / [`Dispatcher::send_named`]: one-shot
//!   commands that resolve to `Result<Response, ProxyError>`.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use meshpack::WireStruct;
use meshwire::Backend;
use meshwire::MessageType;
use meshwire::WireError;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;

use crate::command::Command;
use crate::config::ProxyConfig;
use crate::endpoint::Endpoint;
use crate::endpoint::ManagedNetwork;
use crate::error::ProxyError;
use crate::error::Result;
use crate::registry;
use crate::registry::Response;
use crate::session;
use crate::session::Session;
use crate::transport::Exchange;
use crate::transport::Transport;

/// An encoded envelope ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub message_type: MessageType,
    pub bytes: Vec<u8>,
}

impl Request {
    pub fn new<T: WireStruct>(message_type: impl Into<MessageType>, body: &T) -> std::result::Result<Self, WireError> {
        let message_type = message_type.into();
        let bytes = meshwire::encode_message(message_type, body)?;
        Ok(Self { message_type, bytes })
    }
}

/// Why a request produced no response.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub timeout: bool,
    pub reason: String,
}

/// The single outcome of a fire-and-collect request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub message_type: MessageType,
    pub success: bool,
    pub elapsed_ms: u64,
    pub outcome: std::result::Result<Response, Failure>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub requests: u64,
    pub decode_failures: u64,
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    config: Arc<ProxyConfig>,
    requests: AtomicU64,
    decode_failures: AtomicU64,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ProxyConfig>) -> Self {
        Self {
            transport,
            config,
            requests: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            requests: self.requests.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }

    /// Address of `backend` within `network`, using the configured ports.
    pub fn endpoint(&self, network: &ManagedNetwork, backend: Backend) -> Endpoint {
        network.endpoint(backend, &self.config.backend)
    }

    /// Sends a request to a backend's own applications and reports how it went.
    pub async fn send_request(&self, endpoint: Endpoint, request: Request) -> RequestEvent {
        let message_type = request.message_type;
        let start = Instant::now();
        let outcome = self.exchange(endpoint, request, "").await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let outcome = outcome.map_err(|e| Failure { timeout: e.is_timeout(), reason: e.to_string() });
        RequestEvent { message_type, success: outcome.is_ok(), elapsed_ms, outcome }
    }

    /// Runs a command against `network`. `minion` relays through a node; empty
    /// addresses the backend itself.
    pub async fn send_command(&self, network: &ManagedNetwork, command: &Command, minion: &str) -> Result<Response> {
        let request = command.to_request()?;
        let endpoint = self.endpoint(network, request.message_type.backend());
        debug!(
            network = %network.name,
            command = command.name(),
            msg_type = %request.message_type,
            endpoint = %endpoint,
            "sending command"
        );
        self.exchange(endpoint, request, minion).await
    }

    /// Like [`Dispatcher::send_command`], parsing the command from its name and
    /// JSON parameters first. Unknown names and bad parameters fail here,
    /// before any socket is opened.
    pub async fn send_named(
        &self,
        network: &ManagedNetwork,
        name: &str,
        params: Value,
        minion: &str,
    ) -> Result<Response> {
        let command = Command::from_named(name, params)?;
        self.send_command(network, &command, minion).await
    }

    async fn exchange(&self, endpoint: Endpoint, request: Request, minion: &str) -> Result<Response> {
        let message_type = request.message_type;
        let Some(route) = registry::route(message_type) else {
            error!(msg_type = %message_type, "no route for request type");
            return Err(ProxyError::Unroutable(message_type));
        };
        self.requests.fetch_add(1, Ordering::Relaxed);

        let exchange = Exchange {
            endpoint,
            sender_identity: session::sender_identity(route.sender_app),
            receiver_identity: route.receiver_app.to_string(),
            minion_identity: minion.to_string(),
            payload: request.bytes,
        };
        let timeout = self.config.backend.exchange_timeout();
        let session = Session::new(self.transport.clone(), exchange, route.response, timeout);
        let bytes = session.run().await?;

        let response = match registry::decode_response(route.backend, route.response, &bytes) {
            Ok(response) => response,
            Err(e) => {
                self.decode_failures.fetch_add(1, Ordering::Relaxed);
                error!(msg_type = %message_type, endpoint = %endpoint, error = %e, "undecodable reply");
                return Err(ProxyError::Decode(e));
            }
        };

        match response.ack() {
            Some((false, message)) => Err(ProxyError::Rejected(message.to_string())),
            _ => Ok(response),
        }
    }
}
