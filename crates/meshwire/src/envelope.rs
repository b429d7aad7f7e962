//! # Envelope
//!
//! Every message on the dealer socket is a [`Message`] whose `value` carries a
//! second, independently encoded struct. Encoding runs the codec twice, inner
//! struct first; decoding peels the layers in reverse.

use meshpack::WireStruct;
use meshpack::wire_struct;

use crate::Backend;
use crate::MessageType;
use crate::Result;

wire_struct! {
    pub struct Message {
        1 => m_type: i32,
        2 => value: Vec<u8>,
    }
}

wire_struct! {
    /// Generic controller acknowledgement.
    pub struct E2EAck {
        1 => success: bool,
        2 => message: String,
    }
}

impl Message {
    /// Wraps an encoded inner struct.
    pub fn new<T: WireStruct>(m_type: MessageType, body: &T) -> Result<Self> {
        Ok(Self {
            m_type: m_type.as_i32(),
            value: meshpack::encode(body)?,
        })
    }

    /// Resolves `m_type` in the namespace of the backend that sent it.
    pub fn message_type(&self, backend: Backend) -> Result<MessageType> {
        backend.message_type(self.m_type)
    }

    /// Decodes the inner struct with a fresh reader over `value`.
    pub fn payload<T: WireStruct>(&self) -> Result<T> {
        Ok(meshpack::decode(&self.value)?)
    }
}

/// Encodes `body` as the payload of a `m_type` envelope.
pub fn encode_message<T: WireStruct>(m_type: MessageType, body: &T) -> Result<Vec<u8>> {
    let message = Message::new(m_type, body)?;
    Ok(meshpack::encode(&message)?)
}

/// Decodes the outer envelope only. The payload stays encoded until the caller
/// knows which struct `m_type` selects.
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    Ok(meshpack::decode(bytes)?)
}
