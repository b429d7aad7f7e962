//! Schema declaration macros.
//!
//! `wire_struct!` declares a struct whose members carry explicit field ids and
//! implements the codec traits for it. `wire_enum!` declares an `i32`-backed enum.
//! Both derive serde through the re-exported [`crate::serde`], so decoded values
//! can be handed upstream as JSON without the calling crate naming serde itself.

/// Declares a schema struct.
///
/// ```ignore
/// wire_struct! {
///     pub struct Site {
///         1 => name: String,
///         2 => location: Location,
///     }
/// }
/// ```
///
/// Members are written in declaration order. When decoding, absent members keep
/// their default, `Option` members stay `None`, and unknown ids are skipped.
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $id:literal => $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, $crate::serde::Serialize, $crate::serde::Deserialize)]
        #[serde(crate = "::meshpack::serde", default)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $crate::WireValue for $name {
            const TYPE: $crate::FieldType = $crate::FieldType::Struct;

            fn write(&self, enc: &mut $crate::Encoder) -> $crate::Result<()> {
                enc.struct_begin()?;
                $( $crate::Field::write_field(&self.$field, enc, $id)?; )*
                enc.struct_end()
            }

            #[allow(unused_mut)]
            fn read(dec: &mut $crate::Decoder<'_>) -> $crate::Result<Self> {
                let mut out = Self::default();
                dec.struct_begin()?;
                while let Some(header) = dec.field_begin()? {
                    match header.id {
                        $( $id => $crate::Field::read_field(&mut out.$field, dec, header.ty)?, )*
                        _ => dec.skip(header.ty)?,
                    }
                }
                dec.struct_end()?;
                Ok(out)
            }
        }

        impl $crate::WireStruct for $name {}
    };
}

/// Declares an `i32`-backed schema enum. The first variant is the default.
///
/// Serialized names are SCREAMING_SNAKE_CASE, matching the shared schema.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $first:ident = $first_value:literal
            $(, $variant:ident = $value:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            $crate::serde::Serialize, $crate::serde::Deserialize,
        )]
        #[serde(crate = "::meshpack::serde", rename_all = "SCREAMING_SNAKE_CASE")]
        $vis enum $name {
            #[default]
            $first = $first_value,
            $( $variant = $value, )*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$name::$first, $( $name::$variant, )*];

            pub fn from_i32(v: i32) -> Option<Self> {
                match v {
                    $first_value => Some($name::$first),
                    $( $value => Some($name::$variant), )*
                    _ => None,
                }
            }

            pub fn as_i32(self) -> i32 {
                self as i32
            }

            pub fn name(self) -> &'static str {
                match self {
                    $name::$first => stringify!($first),
                    $( $name::$variant => stringify!($variant), )*
                }
            }
        }

        impl $crate::WireValue for $name {
            const TYPE: $crate::FieldType = $crate::FieldType::I32;

            fn write(&self, enc: &mut $crate::Encoder) -> $crate::Result<()> {
                enc.i32(*self as i32)
            }

            fn read(dec: &mut $crate::Decoder<'_>) -> $crate::Result<Self> {
                let value = dec.i32()?;
                Self::from_i32(value).ok_or($crate::Error::UnknownEnumValue {
                    name: stringify!($name),
                    value,
                })
            }
        }
    };
}
