//! # Meshpack
//!
//! The byte layer shared by the mesh controller, the aggregator, and this proxy.
//!
//! ## Layers
//!
//! - **Compact protocol** ([`compact`]): typed fields keyed by numeric ids, zigzag
//!   varints, and nested structs terminated by a `STOP` byte.
//! - **Framing transport** ([`framed`]): a 4-byte big-endian length header around
//!   each flushed buffer. The dealer socket frames messages itself, so encoding
//!   strips the header again before the bytes leave the process.
//!
//! ## Format
//!
//! - **Field header**: `[delta << 4 | type]`, or `[type][zigzag id]` when the id
//!   delta does not fit in a nibble.
//! - **Scalars**: `i16`/`i32`/`i64` as zigzag varints, `double` as 8 bytes LE.
//! - **Binary**: `[varint len][bytes]`.
//! - **Collections**: `[size << 4 | elem]` (or `[0xF0 | elem][varint size]`) for
//!   lists and sets; `[varint size][key << 4 | value]` for maps.
//!
//! Schema types are declared with [`wire_struct!`] and [`wire_enum!`].

// lets the macros name `::meshpack` from inside this crate too
extern crate self as meshpack;

pub mod compact;
pub mod framed;
pub mod value;

mod macros;

#[cfg(test)]
mod tests;

pub use compact::Decoder;
pub use compact::Encoder;
pub use compact::FieldHeader;
pub use framed::FramedTransport;
pub use framed::decode;
pub use framed::encode;
pub use value::Field;
pub use value::WireStruct;
pub use value::WireValue;

#[doc(hidden)]
pub use serde;

/// Maximum nesting of structs and collections before decoding gives up.
pub const MAX_DEPTH: usize = 64;

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// The wire type nibble does not name a known type.
    InvalidFieldType(u8),
    /// A known field or collection element carried the wrong wire type.
    TypeMismatch { expected: FieldType, found: FieldType },
    /// A varint ran past 10 bytes or does not fit the target integer.
    VarintOverflow,
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// An enum field carried a value with no matching variant.
    UnknownEnumValue { name: &'static str, value: i32 },
    /// Structs or collections nested deeper than [`MAX_DEPTH`].
    DepthExceeded,
    /// A length or collection size does not fit in an `i32`.
    TooLarge(usize),
    /// `struct_end` without a matching `struct_begin`, or bytes finalized with a struct still open.
    UnbalancedStruct,
    /// A flushed frame is shorter than its 4-byte header.
    FrameTooShort(usize),
    /// The frame header disagrees with the body that follows it.
    FrameLengthMismatch { declared: usize, actual: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedEnd => write!(f, "unexpected end of buffer"),
            Error::InvalidFieldType(b) => write!(f, "invalid field type: {:#04x}", b),
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {:?}, found {:?}", expected, found)
            }
            Error::UnknownEnumValue { name, value } => write!(f, "unknown {} value: {}", name, value),
            Error::FrameLengthMismatch { declared, actual } => {
                write!(f, "frame header declares {} bytes, body has {}", declared, actual)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Wire type of a field or collection element.
///
/// Booleans have two wire codes (`1` true, `2` false); both decode to [`FieldType::Bool`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool = 0x01,
    Byte = 0x03,
    I16 = 0x04,
    I32 = 0x05,
    I64 = 0x06,
    Double = 0x07,
    Binary = 0x08,
    List = 0x09,
    Set = 0x0A,
    Map = 0x0B,
    Struct = 0x0C,
}

impl FieldType {
    /// Returns the type for a wire nibble, or `None` if invalid.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 | 0x02 => Some(FieldType::Bool),
            0x03 => Some(FieldType::Byte),
            0x04 => Some(FieldType::I16),
            0x05 => Some(FieldType::I32),
            0x06 => Some(FieldType::I64),
            0x07 => Some(FieldType::Double),
            0x08 => Some(FieldType::Binary),
            0x09 => Some(FieldType::List),
            0x0A => Some(FieldType::Set),
            0x0B => Some(FieldType::Map),
            0x0C => Some(FieldType::Struct),
            _ => None,
        }
    }

    /// The wire nibble used in collection headers.
    pub fn code(self) -> u8 {
        self as u8
    }
}
