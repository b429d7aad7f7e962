//! # Typed Values
//!
//! Maps Rust types onto compact-protocol wire types.
//!
//! - [`WireValue`]: anything that can appear as a field or collection element.
//! - [`Field`]: how a struct member is written under its field id. Blanket over
//!   `WireValue`, plus `Option<T>` for fields that may be absent.
//! - [`WireStruct`]: a top-level schema struct, the unit handed to [`crate::encode`].

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::Decoder;
use crate::Encoder;
use crate::Error;
use crate::FieldType;
use crate::Result;

/// A value with a fixed wire type.
pub trait WireValue: Sized {
    const TYPE: FieldType;

    fn write(&self, enc: &mut Encoder) -> Result<()>;
    fn read(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Marker for schema structs declared with [`crate::wire_struct!`].
pub trait WireStruct: WireValue + Default {}

/// A struct member written under a field id.
pub trait Field {
    fn write_field(&self, enc: &mut Encoder, id: i16) -> Result<()>;
    fn read_field(&mut self, dec: &mut Decoder<'_>, found: FieldType) -> Result<()>;
}

fn expect_type(expected: FieldType, found: FieldType) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::TypeMismatch { expected, found })
    }
}

impl<T: WireValue> Field for T {
    fn write_field(&self, enc: &mut Encoder, id: i16) -> Result<()> {
        enc.field_begin(id, T::TYPE)?;
        self.write(enc)
    }

    fn read_field(&mut self, dec: &mut Decoder<'_>, found: FieldType) -> Result<()> {
        expect_type(T::TYPE, found)?;
        *self = T::read(dec)?;
        Ok(())
    }
}

impl<T: WireValue> Field for Option<T> {
    fn write_field(&self, enc: &mut Encoder, id: i16) -> Result<()> {
        match self {
            Some(v) => v.write_field(enc, id),
            None => Ok(()),
        }
    }

    fn read_field(&mut self, dec: &mut Decoder<'_>, found: FieldType) -> Result<()> {
        expect_type(T::TYPE, found)?;
        *self = Some(T::read(dec)?);
        Ok(())
    }
}

macro_rules! scalar_value {
    ($ty:ty, $wire:ident, $write:ident, $read:ident) => {
        impl WireValue for $ty {
            const TYPE: FieldType = FieldType::$wire;

            fn write(&self, enc: &mut Encoder) -> Result<()> {
                enc.$write(*self)
            }

            fn read(dec: &mut Decoder<'_>) -> Result<Self> {
                dec.$read()
            }
        }
    };
}

scalar_value!(bool, Bool, bool, bool);
scalar_value!(i8, Byte, i8, i8);
scalar_value!(i16, I16, i16, i16);
scalar_value!(i32, I32, i32, i32);
scalar_value!(i64, I64, i64, i64);
scalar_value!(f64, Double, double, double);

impl WireValue for String {
    const TYPE: FieldType = FieldType::Binary;

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.str(self)
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(dec.str()?.to_owned())
    }
}

/// Raw binary. `u8` is deliberately not a `WireValue`, so this never collides with `Vec<T>`.
impl WireValue for Vec<u8> {
    const TYPE: FieldType = FieldType::Binary;

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.binary(self)
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(dec.binary()?.to_vec())
    }
}

impl<T: WireValue> WireValue for Vec<T> {
    const TYPE: FieldType = FieldType::List;

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.list_begin(T::TYPE, self.len())?;
        for item in self {
            item.write(enc)?;
        }
        Ok(())
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        let (elem, size) = dec.list_begin()?;
        if size > 0 {
            expect_type(T::TYPE, elem)?;
        }
        let mut out = Vec::with_capacity(size);
        for _ in 0..size {
            out.push(T::read(dec)?);
        }
        Ok(out)
    }
}

impl<T: WireValue + Ord> WireValue for BTreeSet<T> {
    const TYPE: FieldType = FieldType::Set;

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.set_begin(T::TYPE, self.len())?;
        for item in self {
            item.write(enc)?;
        }
        Ok(())
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        let (elem, size) = dec.set_begin()?;
        if size > 0 {
            expect_type(T::TYPE, elem)?;
        }
        let mut out = BTreeSet::new();
        for _ in 0..size {
            out.insert(T::read(dec)?);
        }
        Ok(out)
    }
}

impl<K: WireValue + Ord, V: WireValue> WireValue for BTreeMap<K, V> {
    const TYPE: FieldType = FieldType::Map;

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.map_begin(K::TYPE, V::TYPE, self.len())?;
        for (k, v) in self {
            k.write(enc)?;
            v.write(enc)?;
        }
        Ok(())
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut out = BTreeMap::new();
        let Some((key, value, size)) = dec.map_begin()? else {
            return Ok(out);
        };
        expect_type(K::TYPE, key)?;
        expect_type(V::TYPE, value)?;
        for _ in 0..size {
            let k = K::read(dec)?;
            let v = V::read(dec)?;
            out.insert(k, v);
        }
        Ok(out)
    }
}
