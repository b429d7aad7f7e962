//! # Meshproxy
//!
//! Bridges request/response calls from the web tier onto the binary RPC spoken
//! by the mesh controller and the traffic aggregator.
//!
//! ## Layers
//!
//! - **Codec** ([`meshpack`], [`meshwire`]): compact structs inside a message envelope.
//! - **Transport** ([`transport`]): one ZeroMQ dealer connection per exchange.
//! - **Session** ([`session`]): exactly one outcome per exchange, deadline included.
//! - **Registry** ([`registry`]): who receives each request type and how replies decode.
//! - **Dispatcher** ([`dispatcher`]): requests and commands to responses or errors.
//! - **Poller** ([`poller`]): concurrent status reads over every managed network.
//! - **Worker** ([`worker`]): the JSON-lines channel to the parent process.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod poller;
pub mod registry;
pub mod session;
pub mod transport;
pub mod worker;


pub use command::Command;
pub use config::ProxyConfig;
pub use dispatcher::Dispatcher;
pub use dispatcher::Request;
pub use dispatcher::RequestEvent;
pub use endpoint::Endpoint;
pub use endpoint::ManagedNetwork;
pub use error::ProxyError;
pub use poller::PollUpdate;
pub use poller::Poller;
pub use poller::UpdateSink;
pub use registry::Response;
pub use transport::DealerTransport;
pub use transport::PendingReply;
pub use transport::Transport;
pub use transport::TransportError;
pub use worker::Worker;
