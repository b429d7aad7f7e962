use std::fmt;

use meshwire::MessageType;
use meshwire::WireError;

use crate::registry::DecodeError;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// No command of that name exists.
    UnknownCommand(String),
    /// The command exists but its parameters do not fit it.
    InvalidParams { command: String, reason: String },
    /// A message type with no route was handed to the dispatcher.
    Unroutable(MessageType),
    Encode(WireError),
    Decode(DecodeError),
    Transport(TransportError),
    /// The backend acknowledged with `success = false`. Carries its message verbatim.
    Rejected(String),
}

impl ProxyError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout))
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "Unknown command: {}", name),
            Self::InvalidParams { command, reason } => {
                write!(f, "Invalid parameters for {}: {}", command, reason)
            }
            Self::Unroutable(t) => write!(f, "No route for message type {}", t),
            Self::Encode(e) => write!(f, "Encode error: {}", e),
            Self::Decode(e) => write!(f, "Decode error: {}", e),
            Self::Transport(e) => write!(f, "{}", e),
            Self::Rejected(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<TransportError> for ProxyError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<DecodeError> for ProxyError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<WireError> for ProxyError {
    fn from(e: WireError) -> Self {
        Self::Encode(e)
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
