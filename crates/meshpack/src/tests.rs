use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::*;

crate::wire_enum! {
    pub enum Shade {
        Light = 1,
        Dark = 2,
        Negative = -7,
    }
}

crate::wire_struct! {
    pub struct Inner {
        1 => label: String,
        2 => weight: f64,
    }
}

crate::wire_struct! {
    pub struct Outer {
        1 => id: i64,
        2 => flag: bool,
        3 => small: i8,
        4 => short: i16,
        5 => shade: Shade,
        6 => inner: Inner,
        7 => items: Vec<Inner>,
        8 => tags: BTreeSet<String>,
        9 => index: BTreeMap<i32, bool>,
        10 => blob: Vec<u8>,
        11 => maybe: Option<String>,
        // large gap forces the long field header form
        300 => far: i32,
        301 => late_flag: bool,
    }
}

crate::wire_struct! {
    pub struct Empty {}
}

fn sample() -> Outer {
    Outer {
        id: -1_234_567_890_123,
        flag: true,
        small: -3,
        short: 12_000,
        shade: Shade::Negative,
        inner: Inner { label: "a".into(), weight: 0.5 },
        items: (0..20).map(|i| Inner { label: format!("n{}", i), weight: i as f64 }).collect(),
        tags: ["x".to_string(), "y".to_string()].into_iter().collect(),
        index: [(5, true), (-9, false)].into_iter().collect(),
        blob: vec![0, 1, 2, 255],
        maybe: Some("here".into()),
        far: i32::MIN,
        late_flag: false,
    }
}

// ============================================================================
//  SCALARS
// ============================================================================

#[test]
fn test_varint_zigzag_layout() -> Result<()> {
    let mut enc = Encoder::new();
    enc.i32(0)?;
    enc.i32(-1)?;
    enc.i32(1)?;
    enc.i32(64)?;
    let bytes = enc.into_bytes()?;
    assert_eq!(bytes, vec![0x00, 0x01, 0x02, 0x80, 0x01]);

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.i32()?, 0);
    assert_eq!(dec.i32()?, -1);
    assert_eq!(dec.i32()?, 1);
    assert_eq!(dec.i32()?, 64);
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[test]
fn test_integer_extremes() -> Result<()> {
    let mut enc = Encoder::new();
    enc.i16(i16::MIN)?;
    enc.i32(i32::MAX)?;
    enc.i64(i64::MIN)?;
    enc.i64(i64::MAX)?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.i16()?, i16::MIN);
    assert_eq!(dec.i32()?, i32::MAX);
    assert_eq!(dec.i64()?, i64::MIN);
    assert_eq!(dec.i64()?, i64::MAX);
    Ok(())
}

#[test]
fn test_i32_rejects_wide_varint() -> Result<()> {
    let mut enc = Encoder::new();
    enc.i64(i64::from(i32::MAX) + 1)?;
    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.i32(), Err(Error::VarintOverflow));
    Ok(())
}

#[test]
fn test_unterminated_varint() {
    let bytes = [0xFFu8; 11];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.i64(), Err(Error::VarintOverflow));
}

// ============================================================================
//  STRUCTS
// ============================================================================

#[test]
fn test_struct_roundtrip() -> Result<()> {
    let value = sample();
    let bytes = encode(&value)?;
    let back: Outer = decode(&bytes)?;
    assert_eq!(back, value);
    Ok(())
}

#[test]
fn test_bool_field_folds_into_header() -> Result<()> {
    crate::wire_struct! {
        struct Flags {
            1 => on: bool,
            2 => off: bool,
        }
    }

    let bytes = encode(&Flags { on: true, off: false })?;
    // delta 1 + BOOL_TRUE, delta 1 + BOOL_FALSE, STOP
    assert_eq!(bytes, vec![0x11, 0x12, 0x00]);
    Ok(())
}

#[test]
fn test_long_field_header() -> Result<()> {
    crate::wire_struct! {
        struct Far {
            300 => value: i32,
        }
    }

    let bytes = encode(&Far { value: 1 })?;
    // type nibble only, zigzag(300) = 600 = 0xD8 0x04, then zigzag(1), then STOP
    assert_eq!(bytes, vec![0x05, 0xD8, 0x04, 0x02, 0x00]);
    Ok(())
}

#[test]
fn test_empty_struct_is_stop_byte() -> Result<()> {
    assert_eq!(encode(&Empty {})?, vec![0x00]);
    let _: Empty = decode(&[0x00])?;
    Ok(())
}

#[test]
fn test_absent_fields_default() -> Result<()> {
    let back: Outer = decode(&[0x00])?;
    assert_eq!(back, Outer::default());
    assert_eq!(back.maybe, None);
    Ok(())
}

#[test]
fn test_unknown_field_is_skipped() -> Result<()> {
    // Outer as written by a newer schema: Inner with an extra map field the reader does not know.
    crate::wire_struct! {
        struct InnerV2 {
            1 => label: String,
            2 => weight: f64,
            3 => extra: BTreeMap<String, Vec<i64>>,
        }
    }

    let newer = InnerV2 {
        label: "kept".into(),
        weight: 2.0,
        extra: [("k".to_string(), vec![1, 2, 3])].into_iter().collect(),
    };
    let back: Inner = decode(&encode(&newer)?)?;
    assert_eq!(back, Inner { label: "kept".into(), weight: 2.0 });
    Ok(())
}

#[test]
fn test_known_field_type_mismatch() -> Result<()> {
    crate::wire_struct! {
        struct WrongLabel {
            1 => label: i32,
        }
    }

    let bytes = encode(&WrongLabel { label: 5 })?;
    match decode::<Inner>(&bytes) {
        Err(Error::TypeMismatch { expected: FieldType::Binary, found: FieldType::I32 }) => {}
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_unknown_enum_value() -> Result<()> {
    crate::wire_struct! {
        struct RawShade {
            5 => shade: i32,
        }
    }

    let bytes = encode(&RawShade { shade: 99 })?;
    match decode::<Outer>(&bytes) {
        Err(Error::UnknownEnumValue { name: "Shade", value: 99 }) => {}
        other => panic!("Expected UnknownEnumValue, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_schema_types_serialize_as_json() -> std::result::Result<(), serde_json::Error> {
    let inner = Inner { label: "a".into(), weight: 0.5 };
    assert_eq!(serde_json::to_string(&inner)?, r#"{"label":"a","weight":0.5}"#);
    assert_eq!(serde_json::to_string(&Shade::Negative)?, r#""NEGATIVE""#);

    // missing members take their defaults
    let outer: Outer = serde_json::from_str(r#"{"id":7,"shade":"DARK"}"#)?;
    assert_eq!(outer, Outer { id: 7, shade: Shade::Dark, ..Outer::default() });
    Ok(())
}

// ============================================================================
//  FAILURE MODES
// ============================================================================

#[test]
fn test_truncated_input_fails() -> Result<()> {
    let bytes = encode(&sample())?;
    for cut in [1, bytes.len() / 3, bytes.len() / 2, bytes.len() - 1] {
        assert!(decode::<Outer>(&bytes[..cut]).is_err(), "cut at {} decoded", cut);
    }
    Ok(())
}

#[test]
fn test_invalid_type_nibble() {
    // delta 1, type 0x0D does not exist
    match decode::<Inner>(&[0x1D, 0x00]) {
        Err(Error::InvalidFieldType(0x0D)) => {}
        other => panic!("Expected InvalidFieldType, got {:?}", other),
    }
}

#[test]
fn test_oversized_list_claim() {
    // field 7 (list of structs) claiming 1000 elements with two bytes left
    let bytes = [0x79, 0xFC, 0xE8, 0x07, 0x00, 0x00];
    match decode::<Outer>(&bytes) {
        Err(Error::UnexpectedEnd) => {}
        other => panic!("Expected UnexpectedEnd, got {:?}", other),
    }
}

#[test]
fn test_depth_limit() {
    // struct field 1 nested over and over without ever closing
    let bytes = vec![0x1C; MAX_DEPTH * 2];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.skip(FieldType::Struct), Err(Error::DepthExceeded));
}

#[test]
fn test_unbalanced_encoder() {
    let mut enc = Encoder::new();
    assert_eq!(enc.struct_end(), Err(Error::UnbalancedStruct));
    enc.struct_begin().unwrap();
    assert_eq!(enc.into_bytes(), Err(Error::UnbalancedStruct));
}

// ============================================================================
//  FRAMING
// ============================================================================

#[test]
fn test_flush_prefixes_big_endian_length() -> Result<()> {
    let mut transport = FramedTransport::new();
    transport.write(&[0xAA; 3]);
    transport.write(&[0xBB; 2]);
    let frame = transport.flush()?;
    assert_eq!(frame, vec![0, 0, 0, 5, 0xAA, 0xAA, 0xAA, 0xBB, 0xBB]);

    // buffer resets after flush
    assert_eq!(transport.flush()?, vec![0, 0, 0, 0]);
    Ok(())
}

#[test]
fn test_encode_strips_exactly_the_header() -> Result<()> {
    let value = Inner { label: "abc".into(), weight: 1.0 };

    let mut enc = Encoder::new();
    value.write(&mut enc)?;
    let raw = enc.into_bytes()?;

    assert_eq!(encode(&value)?, raw);
    Ok(())
}

#[test]
fn test_strip_header_checks_length() {
    assert_eq!(framed::strip_header(&[0, 0, 1]), Err(Error::FrameTooShort(3)));
    assert_eq!(
        framed::strip_header(&[0, 0, 0, 9, 1]),
        Err(Error::FrameLengthMismatch { declared: 9, actual: 1 })
    );
    assert_eq!(framed::strip_header(&[0, 0, 0, 1, 7]), Ok(&[7u8][..]));
}
