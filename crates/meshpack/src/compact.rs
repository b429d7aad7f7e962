//! # Compact Protocol
//!
//! Field-id keyed binary encoding of schema structs.
//!
//! ## Invariants
//! - **Panic Safety**: Every read is bounds-checked and returns `Result`.
//! - **Bounded Nesting**: Structs and collections deeper than [`MAX_DEPTH`] are rejected.
//! - **Cheap Sizes**: A collection claiming more elements than bytes remain is rejected
//!   before anything is allocated.

use crate::Error;
use crate::FieldType;
use crate::MAX_DEPTH;
use crate::Result;

const STOP: u8 = 0x00;
const BOOL_TRUE: u8 = 0x01;
const BOOL_FALSE: u8 = 0x02;

fn zigzag_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// A field id and wire type read from a struct body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub id: i16,
    pub ty: FieldType,
}

/// Writes compact-protocol bytes into a growable buffer.
///
/// The encoder tracks the last field id of every open struct so headers can be
/// delta-encoded, and defers the header of a bool field until its value is written.
pub struct Encoder {
    buf: Vec<u8>,
    /// Bottom entry belongs to the root and is never popped.
    last_ids: Vec<i16>,
    pending_bool: Option<i16>,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
            last_ids: vec![0],
            pending_bool: None,
        }
    }

    /// Consumes the encoder and returns the written bytes.
    ///
    /// # Errors
    /// Returns `Error::UnbalancedStruct` if a struct is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.last_ids.len() > 1 || self.pending_bool.is_some() {
            return Err(Error::UnbalancedStruct);
        }
        Ok(self.buf)
    }

    /// Opens a struct body. Field ids restart from zero inside it.
    pub fn struct_begin(&mut self) -> Result<()> {
        if self.last_ids.len() > MAX_DEPTH {
            return Err(Error::DepthExceeded);
        }
        self.last_ids.push(0);
        Ok(())
    }

    /// Writes the `STOP` byte and closes the innermost struct.
    pub fn struct_end(&mut self) -> Result<()> {
        if self.last_ids.len() <= 1 || self.pending_bool.is_some() {
            return Err(Error::UnbalancedStruct);
        }
        self.buf.push(STOP);
        self.last_ids.pop();
        Ok(())
    }

    /// Begins a field. Bool headers are held back until [`Encoder::bool`] supplies the value.
    pub fn field_begin(&mut self, id: i16, ty: FieldType) -> Result<()> {
        if self.last_ids.len() <= 1 {
            return Err(Error::UnbalancedStruct);
        }
        if ty == FieldType::Bool {
            self.pending_bool = Some(id);
            return Ok(());
        }
        self.write_field_header(ty.code(), id);
        Ok(())
    }

    fn write_field_header(&mut self, code: u8, id: i16) {
        let last = self.last_ids.last().copied().unwrap_or(0);
        let delta = i32::from(id) - i32::from(last);
        if (1..=15).contains(&delta) {
            self.buf.push(((delta as u8) << 4) | code);
        } else {
            self.buf.push(code);
            self.write_varint(zigzag_i64(i64::from(id)));
        }
        if let Some(slot) = self.last_ids.last_mut() {
            *slot = id;
        }
    }

    fn write_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn write_size(&mut self, size: usize) -> Result<()> {
        if size > i32::MAX as usize {
            return Err(Error::TooLarge(size));
        }
        self.write_varint(size as u64);
        Ok(())
    }

    /// Encodes a bool, folding it into a pending field header if there is one.
    pub fn bool(&mut self, v: bool) -> Result<()> {
        let code = if v { BOOL_TRUE } else { BOOL_FALSE };
        match self.pending_bool.take() {
            Some(id) => self.write_field_header(code, id),
            None => self.buf.push(code),
        }
        Ok(())
    }

    /// Encodes a single raw byte.
    pub fn i8(&mut self, v: i8) -> Result<()> { self.buf.push(v as u8); Ok(()) }
    /// Encodes a zigzag varint `i16`.
    pub fn i16(&mut self, v: i16) -> Result<()> { self.write_varint(zigzag_i64(i64::from(v))); Ok(()) }
    /// Encodes a zigzag varint `i32`.
    pub fn i32(&mut self, v: i32) -> Result<()> { self.write_varint(zigzag_i64(i64::from(v))); Ok(()) }
    /// Encodes a zigzag varint `i64`.
    pub fn i64(&mut self, v: i64) -> Result<()> { self.write_varint(zigzag_i64(v)); Ok(()) }
    /// Encodes a double as 8 bytes LE.
    pub fn double(&mut self, v: f64) -> Result<()> { self.buf.extend_from_slice(&v.to_le_bytes()); Ok(()) }

    /// Encodes a length-prefixed byte blob.
    pub fn binary(&mut self, v: &[u8]) -> Result<()> {
        self.write_size(v.len())?;
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Encodes a UTF-8 string as binary.
    pub fn str(&mut self, v: &str) -> Result<()> {
        self.binary(v.as_bytes())
    }

    /// Writes a list header. The caller writes exactly `size` elements of type `elem` next.
    pub fn list_begin(&mut self, elem: FieldType, size: usize) -> Result<()> {
        if size < 15 {
            self.buf.push(((size as u8) << 4) | elem.code());
            Ok(())
        } else {
            self.buf.push(0xF0 | elem.code());
            self.write_size(size)
        }
    }

    /// Writes a set header; sets share the list layout.
    pub fn set_begin(&mut self, elem: FieldType, size: usize) -> Result<()> {
        self.list_begin(elem, size)
    }

    /// Writes a map header. The caller writes `size` key/value pairs next.
    pub fn map_begin(&mut self, key: FieldType, value: FieldType, size: usize) -> Result<()> {
        if size == 0 {
            self.buf.push(0);
            return Ok(());
        }
        self.write_size(size)?;
        self.buf.push((key.code() << 4) | value.code());
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounds-checked cursor over compact-protocol bytes.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    last_ids: Vec<i16>,
    pending_bool: Option<bool>,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            last_ids: vec![0],
            pending_bool: None,
        }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn read_u8(&mut self) -> Result<u8> {
        let (&b, rest) = self.buf.split_first().ok_or(Error::UnexpectedEnd)?;
        self.buf = rest;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut out = 0u64;
        for shift in (0..70).step_by(7) {
            let b = self.read_u8()?;
            out |= u64::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Ok(out);
            }
        }
        Err(Error::VarintOverflow)
    }

    fn read_size(&mut self) -> Result<usize> {
        let v = self.read_varint()?;
        if v > i32::MAX as u64 {
            return Err(Error::TooLarge(v as usize));
        }
        Ok(v as usize)
    }

    fn read_type(code: u8) -> Result<FieldType> {
        FieldType::from_code(code).ok_or(Error::InvalidFieldType(code))
    }

    /// Opens a struct body.
    pub fn struct_begin(&mut self) -> Result<()> {
        if self.last_ids.len() > MAX_DEPTH {
            return Err(Error::DepthExceeded);
        }
        self.last_ids.push(0);
        Ok(())
    }

    /// Closes the innermost struct. Call after [`Decoder::field_begin`] returned `None`.
    pub fn struct_end(&mut self) -> Result<()> {
        if self.last_ids.len() <= 1 {
            return Err(Error::UnbalancedStruct);
        }
        self.last_ids.pop();
        Ok(())
    }

    /// Reads the next field header, or `None` at the struct's `STOP` byte.
    pub fn field_begin(&mut self) -> Result<Option<FieldHeader>> {
        let byte = self.read_u8()?;
        if byte == STOP {
            return Ok(None);
        }
        let code = byte & 0x0F;
        let ty = Self::read_type(code)?;
        let delta = byte >> 4;
        let id = if delta == 0 {
            let raw = unzigzag_i64(self.read_varint()?);
            i16::try_from(raw).map_err(|_| Error::VarintOverflow)?
        } else {
            let last = self.last_ids.last().copied().unwrap_or(0);
            last.checked_add(i16::from(delta)).ok_or(Error::VarintOverflow)?
        };
        if let Some(slot) = self.last_ids.last_mut() {
            *slot = id;
        }
        if ty == FieldType::Bool {
            self.pending_bool = Some(code == BOOL_TRUE);
        }
        Ok(Some(FieldHeader { id, ty }))
    }

    /// Decodes a bool, taking the value from the preceding field header if it carried one.
    pub fn bool(&mut self) -> Result<bool> {
        if let Some(v) = self.pending_bool.take() {
            return Ok(v);
        }
        Ok(self.read_u8()? == BOOL_TRUE)
    }

    /// Decodes a single raw byte.
    pub fn i8(&mut self) -> Result<i8> { Ok(self.read_u8()? as i8) }

    /// Decodes a zigzag varint `i16`.
    pub fn i16(&mut self) -> Result<i16> {
        i16::try_from(unzigzag_i64(self.read_varint()?)).map_err(|_| Error::VarintOverflow)
    }

    /// Decodes a zigzag varint `i32`.
    pub fn i32(&mut self) -> Result<i32> {
        i32::try_from(unzigzag_i64(self.read_varint()?)).map_err(|_| Error::VarintOverflow)
    }

    /// Decodes a zigzag varint `i64`.
    pub fn i64(&mut self) -> Result<i64> { Ok(unzigzag_i64(self.read_varint()?)) }

    /// Decodes a double (8 bytes LE).
    pub fn double(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// Decodes a length-prefixed byte blob.
    pub fn binary(&mut self) -> Result<&'a [u8]> {
        let len = self.read_size()?;
        self.read_bytes(len)
    }

    /// Decodes a UTF-8 string slice.
    pub fn str(&mut self) -> Result<&'a str> {
        let bytes = self.binary()?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Reads a list header, returning the element type and count.
    pub fn list_begin(&mut self) -> Result<(FieldType, usize)> {
        let byte = self.read_u8()?;
        let elem = Self::read_type(byte & 0x0F)?;
        let short = (byte >> 4) as usize;
        let size = if short == 0x0F { self.read_size()? } else { short };
        // every element occupies at least one byte
        if size > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        Ok((elem, size))
    }

    /// Reads a set header; sets share the list layout.
    pub fn set_begin(&mut self) -> Result<(FieldType, usize)> {
        self.list_begin()
    }

    /// Reads a map header, returning `(key, value, size)`, or `None` for an empty map.
    pub fn map_begin(&mut self) -> Result<Option<(FieldType, FieldType, usize)>> {
        let size = self.read_size()?;
        if size == 0 {
            return Ok(None);
        }
        let types = self.read_u8()?;
        let key = Self::read_type(types >> 4)?;
        let value = Self::read_type(types & 0x0F)?;
        if size.saturating_mul(2) > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        Ok(Some((key, value, size)))
    }

    /// Skips a value of the given type, including nested children.
    pub fn skip(&mut self, ty: FieldType) -> Result<()> {
        self.skip_impl(ty, 0)
    }

    fn skip_impl(&mut self, ty: FieldType, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded);
        }
        match ty {
            FieldType::Bool => { self.bool()?; }
            FieldType::Byte => { self.read_u8()?; }
            FieldType::I16 | FieldType::I32 | FieldType::I64 => { self.read_varint()?; }
            FieldType::Double => { self.read_bytes(8)?; }
            FieldType::Binary => { self.binary()?; }
            FieldType::List | FieldType::Set => {
                let (elem, size) = self.list_begin()?;
                for _ in 0..size {
                    self.skip_impl(elem, depth + 1)?;
                }
            }
            FieldType::Map => {
                if let Some((key, value, size)) = self.map_begin()? {
                    for _ in 0..size {
                        self.skip_impl(key, depth + 1)?;
                        self.skip_impl(value, depth + 1)?;
                    }
                }
            }
            FieldType::Struct => {
                self.struct_begin()?;
                while let Some(header) = self.field_begin()? {
                    self.skip_impl(header.ty, depth + 1)?;
                }
                self.struct_end()?;
            }
        }
        Ok(())
    }
}
