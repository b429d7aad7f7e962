//! # Framing Transport
//!
//! Buffers protocol writes and emits them as `[len: u32 BE][body]` on flush.
//!
//! The backends' socket layer delivers whole messages, so the proxy never sends the
//! length header: [`encode`] flushes the frame and then strips exactly four bytes.
//! On the way in, [`FramedTransport::reader`] wraps an already-delimited buffer.

use crate::Decoder;
use crate::Encoder;
use crate::Error;
use crate::Result;
use crate::WireStruct;

/// Size of the frame length header.
pub const HEADER_LEN: usize = 4;

/// A write buffer that is emitted as one length-prefixed frame.
#[derive(Debug, Default)]
pub struct FramedTransport {
    wbuf: Vec<u8>,
}

impl FramedTransport {
    pub fn new() -> Self {
        Self { wbuf: Vec::new() }
    }

    /// Appends protocol bytes to the pending frame.
    pub fn write(&mut self, bytes: &[u8]) {
        self.wbuf.extend_from_slice(bytes);
    }

    /// Emits the pending bytes as one frame and resets the buffer.
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        let body = std::mem::take(&mut self.wbuf);
        let len = u32::try_from(body.len()).map_err(|_| Error::TooLarge(body.len()))?;
        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Wraps bytes whose framing was already removed by the socket layer.
    pub fn reader(bytes: &[u8]) -> Decoder<'_> {
        Decoder::new(bytes)
    }
}

/// Removes the length header from a flushed frame, checking it against the body.
pub fn strip_header(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < HEADER_LEN {
        return Err(Error::FrameTooShort(frame.len()));
    }
    let (header, body) = frame.split_at(HEADER_LEN);
    let mut raw = [0u8; HEADER_LEN];
    raw.copy_from_slice(header);
    let declared = u32::from_be_bytes(raw) as usize;
    if declared != body.len() {
        return Err(Error::FrameLengthMismatch { declared, actual: body.len() });
    }
    Ok(body)
}

/// Serializes a struct into the bytes sent on the wire (framing header removed).
pub fn encode<T: WireStruct>(value: &T) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    value.write(&mut enc)?;

    let mut transport = FramedTransport::new();
    transport.write(&enc.into_bytes()?);
    let frame = transport.flush()?;
    Ok(strip_header(&frame)?.to_vec())
}

/// Deserializes a struct from wire bytes.
///
/// # Errors
/// Truncated input, unknown wire types, or type mismatches on known fields.
pub fn decode<T: WireStruct>(bytes: &[u8]) -> Result<T> {
    let mut dec = FramedTransport::reader(bytes);
    T::read(&mut dec)
}
