//! # Meshwire
//!
//! The schema spoken on the controller and aggregator dealer sockets.
//!
//! - [`message_type`]: the two message-type namespaces and [`Backend`].
//! - [`envelope`]: the outer [`Message`] and the double-framed codec.
//! - Schema modules, one per functional area: [`topology`], [`status`],
//!   [`ignition`], [`scan`], [`upgrade`], [`config`], [`aggregator`].
//!
//! All structs are declared with [`meshpack::wire_struct!`] and derive serde, so a
//! decoded reply can be handed to the web tier as JSON without another model.

pub mod aggregator;
pub mod config;
pub mod envelope;
pub mod ignition;
pub mod message_type;
pub mod scan;
pub mod status;
pub mod topology;
pub mod upgrade;

#[cfg(test)]
mod tests;

pub use envelope::E2EAck;
pub use envelope::Message;
pub use envelope::decode_message;
pub use envelope::encode_message;
pub use message_type::AggrMessageType;
pub use message_type::Backend;
pub use message_type::CtrlMessageType;
pub use message_type::MessageType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    Codec(meshpack::Error),
    UnknownMessageType { backend: Backend, value: i32 },
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "Codec error: {}", e),
            Self::UnknownMessageType { backend, value } => {
                write!(f, "Unknown {} message type: {}", backend, value)
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<meshpack::Error> for WireError {
    fn from(e: meshpack::Error) -> Self {
        Self::Codec(e)
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
