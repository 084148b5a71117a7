//! In-process value bridge
//!
//! Applies the conversion rules of the generated Go code directly to dynamic values, so the
//! round-trip behaviour of a type can be checked without compiling any Go.

use error_stack::Report;

use crate::context::GenerationContext;
use crate::descriptor::{InterfaceRef, ScalarKind, StructRef, TypeDescriptor};
use crate::error::{Error, Result};
use crate::schema::ScalarSchema;

/// A Go value as the native service sees it
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NativeValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Nil,
    Pointer(Box<NativeValue>),
    List(Vec<NativeValue>),
    Map(Vec<(NativeValue, NativeValue)>),
    /// Field values by Go field name
    Struct(Vec<(String, NativeValue)>),
    /// An `error` value; `None` is the nil error
    Error(Option<String>),
    /// A `time.Time` at whole Unix seconds
    Time(i64),
    Func,
}

/// A value as the generated bindings hold it
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WireValue {
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Repeated(Vec<WireValue>),
    Map(Vec<(WireValue, WireValue)>),
    /// Field values by field number; `None` is an absent message
    Message(Option<Vec<(u32, WireValue)>>),
    /// Packed payload of an open interface value; `None` is an unset `Any`
    Any(Option<Box<NativeValue>>),
}

fn mismatch(ty: &TypeDescriptor, found: impl std::fmt::Debug) -> Report<Error> {
    Report::new(Error::ValueMismatch(format!("expected {ty}, found {found:?}")))
}

/// Convert a native value to its wire form
pub(crate) fn encode(
    ctx: &mut GenerationContext,
    ty: &TypeDescriptor,
    value: &NativeValue,
) -> Result<WireValue> {
    match (ty, value) {
        (TypeDescriptor::Scalar(scalar), _) => encode_scalar(ty, scalar.kind, value),
        (TypeDescriptor::Pointer(_), NativeValue::Nil) => zero_wire(ty),
        (TypeDescriptor::Pointer(inner), NativeValue::Pointer(pointee)) => {
            encode(ctx, inner, pointee)
        }
        (TypeDescriptor::Slice(element) | TypeDescriptor::Array { element, .. }, _)
            if element.is_byte() =>
        {
            match value {
                NativeValue::Bytes(bytes) => Ok(WireValue::Bytes(bytes.clone())),
                NativeValue::Nil => Ok(WireValue::Bytes(Vec::new())),
                _ => Err(mismatch(ty, value)),
            }
        }
        (TypeDescriptor::Slice(_) | TypeDescriptor::Array { .. }, NativeValue::Nil) => {
            Ok(WireValue::Repeated(Vec::new()))
        }
        (
            TypeDescriptor::Slice(element) | TypeDescriptor::Array { element, .. },
            NativeValue::List(items),
        ) => items
            .iter()
            .map(|item| encode(ctx, element, item))
            .collect::<Result<_>>()
            .map(WireValue::Repeated),
        (TypeDescriptor::Map { .. }, NativeValue::Nil) => Ok(WireValue::Map(Vec::new())),
        (TypeDescriptor::Map { key, value: element }, NativeValue::Map(entries)) => entries
            .iter()
            .map(|(entry_key, entry_value)| {
                Ok((encode(ctx, key, entry_key)?, encode(ctx, element, entry_value)?))
            })
            .collect::<Result<_>>()
            .map(WireValue::Map),
        (
            TypeDescriptor::Interface(InterfaceRef {
                implements_error: true,
                ..
            }),
            NativeValue::Nil | NativeValue::Error(None),
        ) => Ok(WireValue::String(String::new())),
        (
            TypeDescriptor::Interface(InterfaceRef {
                implements_error: true,
                ..
            }),
            NativeValue::Error(Some(message)),
        ) => Ok(WireValue::String(message.clone())),
        (TypeDescriptor::Interface(interface), NativeValue::Nil) if !interface.implements_error => {
            Ok(WireValue::Any(None))
        }
        (TypeDescriptor::Interface(interface), _) if !interface.implements_error => {
            Ok(WireValue::Any(Some(Box::new(value.clone()))))
        }
        (TypeDescriptor::Struct(reference), NativeValue::Time(seconds))
            if reference.is_timestamp() =>
        {
            Ok(WireValue::Int64(*seconds))
        }
        (TypeDescriptor::Struct(reference), NativeValue::Struct(fields))
            if !reference.is_timestamp() =>
        {
            encode_struct(ctx, reference, fields)
        }
        _ => Err(mismatch(ty, value)),
    }
}

fn encode_struct(
    ctx: &mut GenerationContext,
    reference: &StructRef,
    fields: &[(String, NativeValue)],
) -> Result<WireValue> {
    let def = ctx.struct_def(&reference.id)?;
    let mut encoded = Vec::new();
    for (number, field) in (1..).zip(
        def.exported_fields()
            .filter(|field| !field.ty.is_elided()),
    ) {
        let value = fields
            .iter()
            .find(|(name, _)| *name == field.name)
            .map_or(&NativeValue::Nil, |(_, value)| value);
        let wire = if *value == NativeValue::Nil {
            zero_wire(&field.ty)?
        } else {
            encode(ctx, &field.ty, value)?
        };
        encoded.push((number, wire));
    }
    Ok(WireValue::Message(Some(encoded)))
}

#[allow(clippy::cast_possible_truncation, reason = "Go numeric conversions truncate")]
fn encode_scalar(ty: &TypeDescriptor, kind: ScalarKind, value: &NativeValue) -> Result<WireValue> {
    Ok(match (ScalarSchema::for_kind(kind), value) {
        (ScalarSchema::Int32, NativeValue::Int(int)) => {
            WireValue::Int32(narrow_signed(kind, *int) as i32)
        }
        (ScalarSchema::Int64, NativeValue::Int(int)) => WireValue::Int64(*int),
        (ScalarSchema::Uint32, NativeValue::Uint(uint)) => {
            WireValue::Uint32(narrow_unsigned(kind, *uint) as u32)
        }
        (ScalarSchema::Uint64, NativeValue::Uint(uint)) => WireValue::Uint64(*uint),
        (ScalarSchema::Float, NativeValue::Float(float)) => WireValue::Float(*float as f32),
        (ScalarSchema::Double, NativeValue::Float(float)) => WireValue::Double(*float),
        (ScalarSchema::Bool, NativeValue::Bool(flag)) => WireValue::Bool(*flag),
        (ScalarSchema::String, NativeValue::String(text)) => WireValue::String(text.clone()),
        _ => return Err(mismatch(ty, value)),
    })
}

/// Wrap a signed value to the width of `kind`, as a Go conversion to that kind does
#[allow(clippy::cast_possible_truncation, reason = "Go numeric conversions truncate")]
fn narrow_signed(kind: ScalarKind, value: i64) -> i64 {
    match kind {
        ScalarKind::Int8 => i64::from(value as i8),
        ScalarKind::Int16 => i64::from(value as i16),
        ScalarKind::Int | ScalarKind::Int32 => i64::from(value as i32),
        _ => value,
    }
}

#[allow(clippy::cast_possible_truncation, reason = "Go numeric conversions truncate")]
fn narrow_unsigned(kind: ScalarKind, value: u64) -> u64 {
    match kind {
        ScalarKind::Uint8 => u64::from(value as u8),
        ScalarKind::Uint16 => u64::from(value as u16),
        ScalarKind::Uint | ScalarKind::Uint32 => u64::from(value as u32),
        _ => value,
    }
}

/// Wire value the bindings hold when nothing was assigned
fn zero_wire(ty: &TypeDescriptor) -> Result<WireValue> {
    Ok(match ty {
        TypeDescriptor::Scalar(scalar) => match ScalarSchema::for_kind(scalar.kind) {
            ScalarSchema::Int32 => WireValue::Int32(0),
            ScalarSchema::Int64 => WireValue::Int64(0),
            ScalarSchema::Uint32 => WireValue::Uint32(0),
            ScalarSchema::Uint64 => WireValue::Uint64(0),
            ScalarSchema::Float => WireValue::Float(0.0),
            ScalarSchema::Double => WireValue::Double(0.0),
            ScalarSchema::Bool => WireValue::Bool(false),
            ScalarSchema::String => WireValue::String(String::new()),
            ScalarSchema::Bytes => WireValue::Bytes(Vec::new()),
            ScalarSchema::Any => WireValue::Any(None),
        },
        TypeDescriptor::Pointer(inner) => zero_wire(inner)?,
        TypeDescriptor::Slice(element) | TypeDescriptor::Array { element, .. }
            if element.is_byte() =>
        {
            WireValue::Bytes(Vec::new())
        }
        TypeDescriptor::Slice(_) | TypeDescriptor::Array { .. } => WireValue::Repeated(Vec::new()),
        TypeDescriptor::Map { .. } => WireValue::Map(Vec::new()),
        TypeDescriptor::Interface(interface) if interface.implements_error => {
            WireValue::String(String::new())
        }
        TypeDescriptor::Interface(_) => WireValue::Any(None),
        TypeDescriptor::Struct(reference) if reference.is_timestamp() => WireValue::Int64(0),
        TypeDescriptor::Struct(_) => WireValue::Message(None),
        TypeDescriptor::Function | TypeDescriptor::Unsupported(_) => {
            return Err(Report::new(Error::ValueMismatch(format!("{ty} has no wire form"))));
        }
    })
}

/// Convert a wire value back to its native form
pub(crate) fn decode(
    ctx: &mut GenerationContext,
    ty: &TypeDescriptor,
    value: &WireValue,
) -> Result<NativeValue> {
    match (ty, value) {
        (TypeDescriptor::Scalar(scalar), _) => decode_scalar(ty, scalar.kind, value),
        (TypeDescriptor::Pointer(inner), WireValue::Message(None)) if is_message(inner) => {
            Ok(NativeValue::Nil)
        }
        (TypeDescriptor::Pointer(inner), _) => {
            Ok(NativeValue::Pointer(Box::new(decode(ctx, inner, value)?)))
        }
        (TypeDescriptor::Slice(element), WireValue::Bytes(bytes)) if element.is_byte() => {
            Ok(NativeValue::Bytes(bytes.clone()))
        }
        (TypeDescriptor::Array { len, element }, WireValue::Bytes(bytes)) if element.is_byte() => {
            let mut filled = vec![0; array_len(ty, *len)?];
            for (slot, byte) in filled.iter_mut().zip(bytes) {
                *slot = *byte;
            }
            Ok(NativeValue::Bytes(filled))
        }
        (TypeDescriptor::Slice(element), WireValue::Repeated(items)) => items
            .iter()
            .map(|item| decode(ctx, element, item))
            .collect::<Result<_>>()
            .map(NativeValue::List),
        (TypeDescriptor::Array { len, element }, WireValue::Repeated(items)) => {
            let len = array_len(ty, *len)?;
            let zero = decode(ctx, element, &zero_wire(element)?)?;
            let mut decoded = items
                .iter()
                .take(len)
                .map(|item| decode(ctx, element, item))
                .collect::<Result<Vec<_>>>()?;
            decoded.resize(len, zero);
            Ok(NativeValue::List(decoded))
        }
        (TypeDescriptor::Map { key, value: element }, WireValue::Map(entries)) => entries
            .iter()
            .map(|(entry_key, entry_value)| {
                Ok((decode(ctx, key, entry_key)?, decode(ctx, element, entry_value)?))
            })
            .collect::<Result<_>>()
            .map(NativeValue::Map),
        (TypeDescriptor::Interface(interface), WireValue::String(message))
            if interface.implements_error =>
        {
            Ok(NativeValue::Error(
                (!message.is_empty()).then(|| message.clone()),
            ))
        }
        (TypeDescriptor::Interface(_), WireValue::Any(payload)) => Ok(payload
            .as_deref()
            .cloned()
            .unwrap_or(NativeValue::Nil)),
        (TypeDescriptor::Struct(reference), WireValue::Int64(seconds))
            if reference.is_timestamp() =>
        {
            Ok(NativeValue::Time(*seconds))
        }
        (TypeDescriptor::Struct(reference), WireValue::Message(fields))
            if !reference.is_timestamp() =>
        {
            decode_struct(ctx, reference, fields.as_deref().unwrap_or_default())
        }
        _ => Err(mismatch(ty, value)),
    }
}

fn decode_struct(
    ctx: &mut GenerationContext,
    reference: &StructRef,
    fields: &[(u32, WireValue)],
) -> Result<NativeValue> {
    let def = ctx.struct_def(&reference.id)?;
    let mut decoded = Vec::new();
    let mut number = 0;
    for field in def.exported_fields() {
        if field.ty.is_elided() {
            decoded.push((field.name.clone(), NativeValue::Nil));
            continue;
        }
        number += 1;
        let value = match fields.iter().find(|(candidate, _)| *candidate == number) {
            Some((_, value)) => decode(ctx, &field.ty, value)?,
            None => decode(ctx, &field.ty, &zero_wire(&field.ty)?)?,
        };
        decoded.push((field.name.clone(), value));
    }
    Ok(NativeValue::Struct(decoded))
}

const fn is_signed(kind: ScalarKind) -> bool {
    matches!(
        kind,
        ScalarKind::Int
            | ScalarKind::Int8
            | ScalarKind::Int16
            | ScalarKind::Int32
            | ScalarKind::Int64
    )
}

const fn is_unsigned(kind: ScalarKind) -> bool {
    matches!(
        kind,
        ScalarKind::Uint
            | ScalarKind::Uint8
            | ScalarKind::Uint16
            | ScalarKind::Uint32
            | ScalarKind::Uint64
    )
}

const fn is_float(kind: ScalarKind) -> bool {
    matches!(kind, ScalarKind::Float32 | ScalarKind::Float64)
}

fn decode_scalar(ty: &TypeDescriptor, kind: ScalarKind, value: &WireValue) -> Result<NativeValue> {
    Ok(match value {
        WireValue::Int32(int) if is_signed(kind) => {
            NativeValue::Int(narrow_signed(kind, i64::from(*int)))
        }
        WireValue::Int64(int) if is_signed(kind) => NativeValue::Int(*int),
        WireValue::Uint32(uint) if is_unsigned(kind) => {
            NativeValue::Uint(narrow_unsigned(kind, u64::from(*uint)))
        }
        WireValue::Uint64(uint) if is_unsigned(kind) => {
            NativeValue::Uint(*uint)
        }
        WireValue::Float(float) if is_float(kind) => NativeValue::Float(f64::from(*float)),
        WireValue::Double(float) if is_float(kind) => NativeValue::Float(*float),
        WireValue::Bool(flag) if kind == ScalarKind::Bool => NativeValue::Bool(*flag),
        WireValue::String(text) if kind == ScalarKind::String => NativeValue::String(text.clone()),
        _ => return Err(mismatch(ty, value)),
    })
}

fn is_message(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::Struct(reference) if !reference.is_timestamp())
}

fn array_len(ty: &TypeDescriptor, len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| mismatch(ty, len))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::GenerationConfig;
    use crate::descriptor::{FieldDescriptor, QualifiedName, StructDef, Visibility};

    fn field(name: &str, ty: TypeDescriptor) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            ty,
            visibility: Visibility::of(name),
            embedded: false,
        }
    }

    fn reference(name: &str) -> StructRef {
        StructRef {
            id:           QualifiedName::new("example.org/dep", "example.org/dep", name),
            package_name: "dep".to_string(),
        }
    }

    fn context() -> GenerationContext {
        let mut ctx = GenerationContext::new(GenerationConfig {
            module_cache: PathBuf::from("/nonexistent/cache"),
            ..GenerationConfig::default()
        });
        ctx.register_struct(StructDef {
            id:     reference("Part").id,
            fields: vec![
                field("Serial", TypeDescriptor::scalar(ScalarKind::Uint64)),
                field("Weight", TypeDescriptor::scalar(ScalarKind::Float32)),
            ],
        });
        ctx.register_struct(StructDef {
            id:     reference("Widget").id,
            fields: vec![
                field("Name", TypeDescriptor::scalar(ScalarKind::String)),
                field("Count", TypeDescriptor::scalar(ScalarKind::Int)),
                field("Main", TypeDescriptor::Struct(reference("Part"))),
                field(
                    "Spare",
                    TypeDescriptor::pointer(TypeDescriptor::Struct(reference("Part"))),
                ),
                field("Parts", TypeDescriptor::slice(TypeDescriptor::Struct(reference("Part")))),
                field(
                    "Labels",
                    TypeDescriptor::map(
                        TypeDescriptor::scalar(ScalarKind::String),
                        TypeDescriptor::scalar(ScalarKind::Int16),
                    ),
                ),
                field("Blob", TypeDescriptor::slice(TypeDescriptor::scalar(ScalarKind::Uint8))),
                field("Failure", TypeDescriptor::error()),
                field("Built", TypeDescriptor::time()),
                field("Callback", TypeDescriptor::Function),
                field("secret", TypeDescriptor::scalar(ScalarKind::String)),
            ],
        });
        ctx
    }

    fn part(serial: u64, weight: f64) -> NativeValue {
        NativeValue::Struct(vec![
            ("Serial".to_string(), NativeValue::Uint(serial)),
            ("Weight".to_string(), NativeValue::Float(weight)),
        ])
    }

    fn widget(callback: NativeValue) -> NativeValue {
        NativeValue::Struct(vec![
            ("Name".to_string(), NativeValue::String("gear".to_string())),
            ("Count".to_string(), NativeValue::Int(-3)),
            ("Main".to_string(), part(1, 0.5)),
            ("Spare".to_string(), NativeValue::Nil),
            ("Parts".to_string(), NativeValue::List(vec![part(2, 1.25), part(3, 2.0)])),
            (
                "Labels".to_string(),
                NativeValue::Map(vec![
                    (NativeValue::String("a".to_string()), NativeValue::Int(1)),
                    (NativeValue::String("b".to_string()), NativeValue::Int(-2)),
                ]),
            ),
            ("Blob".to_string(), NativeValue::Bytes(vec![0, 1, 254])),
            ("Failure".to_string(), NativeValue::Error(Some("worn out".to_string()))),
            ("Built".to_string(), NativeValue::Time(1_700_000_000)),
            ("Callback".to_string(), callback),
        ])
    }

    #[test]
    fn test_struct_round_trip() {
        let mut ctx = context();
        let ty = TypeDescriptor::Struct(reference("Widget"));
        let wire = encode(&mut ctx, &ty, &widget(NativeValue::Nil)).unwrap();
        let native = decode(&mut ctx, &ty, &wire).unwrap();
        assert_eq!(native, widget(NativeValue::Nil));
    }

    #[test]
    fn test_function_fields_come_back_nil() {
        let mut ctx = context();
        let ty = TypeDescriptor::Struct(reference("Widget"));
        let wire = encode(&mut ctx, &ty, &widget(NativeValue::Func)).unwrap();
        let native = decode(&mut ctx, &ty, &wire).unwrap();
        assert_eq!(native, widget(NativeValue::Nil));
    }

    #[test]
    fn test_wire_shape_skips_function_fields() {
        let mut ctx = context();
        let ty = TypeDescriptor::Struct(reference("Widget"));
        let encoded = encode(&mut ctx, &ty, &widget(NativeValue::Func)).unwrap();
        let WireValue::Message(Some(fields)) = encoded else {
            unreachable!("widgets encode to present messages");
        };
        let numbers: Vec<u32> = fields.iter().map(|(number, _)| *number).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
        assert_eq!(fields[3].1, WireValue::Message(None));
        assert_eq!(fields[6].1, WireValue::Bytes(vec![0, 1, 254]));
        assert_eq!(fields[7].1, WireValue::String("worn out".to_string()));
        assert_eq!(fields[8].1, WireValue::Int64(1_700_000_000));
    }

    #[test]
    fn test_numeric_narrowing() {
        let mut ctx = context();
        let uint = TypeDescriptor::scalar(ScalarKind::Uint);
        assert_eq!(
            encode(&mut ctx, &uint, &NativeValue::Uint(u64::MAX)).unwrap(),
            WireValue::Uint32(u32::MAX)
        );
        let int8 = TypeDescriptor::scalar(ScalarKind::Int8);
        assert_eq!(
            decode(&mut ctx, &int8, &WireValue::Int32(200)).unwrap(),
            NativeValue::Int(-56)
        );
        let float = TypeDescriptor::scalar(ScalarKind::Float32);
        assert_eq!(
            encode(&mut ctx, &float, &NativeValue::Float(0.5)).unwrap(),
            WireValue::Float(0.5)
        );
    }

    #[test]
    fn test_nil_values() {
        let mut ctx = context();
        assert_eq!(
            encode(&mut ctx, &TypeDescriptor::error(), &NativeValue::Nil).unwrap(),
            WireValue::String(String::new())
        );
        assert_eq!(
            decode(&mut ctx, &TypeDescriptor::error(), &WireValue::String(String::new())).unwrap(),
            NativeValue::Error(None)
        );
        let spare = TypeDescriptor::pointer(TypeDescriptor::Struct(reference("Part")));
        assert_eq!(
            decode(&mut ctx, &spare, &WireValue::Message(None)).unwrap(),
            NativeValue::Nil
        );
        let count = TypeDescriptor::pointer(TypeDescriptor::scalar(ScalarKind::Int32));
        let encoded = encode(&mut ctx, &count, &NativeValue::Nil).unwrap();
        assert_eq!(
            decode(&mut ctx, &count, &encoded).unwrap(),
            NativeValue::Pointer(Box::new(NativeValue::Int(0)))
        );
    }

    #[test]
    fn test_fixed_arrays_are_sized() {
        let mut ctx = context();
        let ty = TypeDescriptor::Array {
            len:     3,
            element: Box::new(TypeDescriptor::scalar(ScalarKind::Int64)),
        };
        let wire = WireValue::Repeated(vec![WireValue::Int64(7)]);
        assert_eq!(
            decode(&mut ctx, &ty, &wire).unwrap(),
            NativeValue::List(vec![NativeValue::Int(7), NativeValue::Int(0), NativeValue::Int(0)])
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let mut ctx = context();
        let error = encode(
            &mut ctx,
            &TypeDescriptor::scalar(ScalarKind::String),
            &NativeValue::Int(1),
        )
        .unwrap_err();
        assert!(matches!(error.current_context(), Error::ValueMismatch(_)));
    }
}
