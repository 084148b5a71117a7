//! Bindings to native values

use super::convert::{Converter, Direction, assign};
use super::writer::GoWriter;
use crate::descriptor::{InterfaceRef, QualifiedName, StructRef, TypeDescriptor};
use crate::error::Result;
use crate::schema::ScalarSchema;

impl Converter<'_> {
    /// Write statements storing the native form of binding expression `source` into `target`
    ///
    /// With `declare` the statements introduce `target`; otherwise `target` is an existing,
    /// zero-valued location such as a field path or a slice element.
    pub(crate) fn decode(
        &mut self,
        out: &mut GoWriter,
        target: &str,
        declare: bool,
        source: &str,
        ty: &TypeDescriptor,
    ) -> Result<()> {
        match ty {
            TypeDescriptor::Scalar(scalar) => {
                let native = self.native_type(ty);
                let wire = ScalarSchema::for_kind(scalar.kind).go_type();
                if native == wire {
                    assign(out, target, declare, source);
                } else {
                    assign(out, target, declare, &format!("{native}({source})"));
                }
            }
            TypeDescriptor::Pointer(inner) if is_message(inner) => {
                if declare {
                    let native = self.native_type(ty);
                    out.line(format!("var {target} {native}"));
                }
                let value = self.local("value");
                out.open(format!("if {source} != nil {{"));
                self.decode(out, &value, true, source, inner)?;
                out.line(format!("{target} = &{value}"));
                out.close("}");
            }
            TypeDescriptor::Pointer(inner) => {
                let value = self.local("value");
                self.decode(out, &value, true, source, inner)?;
                assign(out, target, declare, &format!("&{value}"));
            }
            TypeDescriptor::Slice(element) if element.is_byte() => {
                let native = self.native_type(ty);
                assign(out, target, declare, &format!("{native}({source})"));
            }
            TypeDescriptor::Slice(element) => {
                let native = self.native_type(ty);
                assign(out, target, declare, &format!("make({native}, len({source}))"));
                let (index, item) = (self.local("i"), self.local("item"));
                out.open(format!("for {index}, {item} := range {source} {{"));
                self.decode(out, &format!("{target}[{index}]"), false, &item, element)?;
                out.close("}");
            }
            TypeDescriptor::Array { element, .. } => {
                if declare {
                    let native = self.native_type(ty);
                    out.line(format!("var {target} {native}"));
                }
                if element.is_byte() {
                    out.line(format!("copy({target}[:], {source})"));
                } else {
                    let (index, item) = (self.local("i"), self.local("item"));
                    out.open(format!("for {index}, {item} := range {source} {{"));
                    out.open(format!("if {index} >= len({target}) {{"));
                    out.line("break");
                    out.close("}");
                    self.decode(out, &format!("{target}[{index}]"), false, &item, element)?;
                    out.close("}");
                }
            }
            TypeDescriptor::Map { key, value } => {
                let native = self.native_type(ty);
                if self.wire_type(ty)?.as_deref() == Some(native.as_str()) {
                    assign(out, target, declare, source);
                    return Ok(());
                }
                assign(out, target, declare, &format!("make({native}, len({source}))"));
                let (wire_key, wire_value) = (self.local("k"), self.local("v"));
                let (native_key, native_value) = (self.local("key"), self.local("value"));
                out.open(format!("for {wire_key}, {wire_value} := range {source} {{"));
                self.decode(out, &native_key, true, &wire_key, key)?;
                self.decode(out, &native_value, true, &wire_value, value)?;
                out.line(format!("{target}[{native_key}] = {native_value}"));
                out.close("}");
            }
            TypeDescriptor::Interface(interface) => {
                self.decode_interface(out, target, declare, source, ty, interface);
            }
            TypeDescriptor::Struct(reference) if reference.is_timestamp() => {
                self.imports().standard("time");
                assign(out, target, declare, &format!("time.Unix({source}, 0)"));
            }
            TypeDescriptor::Struct(reference) => {
                if self.is_active(Direction::Decode, &reference.id) {
                    let helper = self.helper(Direction::Decode, reference);
                    assign(out, target, declare, &format!("{helper}({source})"));
                    return Ok(());
                }
                if declare {
                    let native = self.native_struct(reference);
                    out.line(format!("var {target} {native}"));
                }
                self.enter(Direction::Decode, &reference.id);
                let written = self.decode_fields(out, target, source, reference);
                self.leave();
                written?;
            }
            TypeDescriptor::Function | TypeDescriptor::Unsupported(_) => {
                tracing::trace!("No decode statements for {ty}");
            }
        }
        Ok(())
    }

    fn decode_interface(
        &mut self,
        out: &mut GoWriter,
        target: &str,
        declare: bool,
        source: &str,
        ty: &TypeDescriptor,
        interface: &InterfaceRef,
    ) {
        let native = self.native_type(ty);
        if declare {
            out.line(format!("var {target} {native}"));
        }
        let builtin_error = interface.name.as_ref() == Some(&QualifiedName::error());
        if interface.implements_error {
            self.imports().standard("errors");
            out.open(format!("if {source} != \"\" {{"));
            if builtin_error {
                out.line(format!("{target} = errors.New({source})"));
            } else {
                out.open(format!(
                    "if value, ok := any(errors.New({source})).({native}); ok {{"
                ));
                out.line(format!("{target} = value"));
                out.close("}");
            }
            out.close("}");
        } else if interface.name.is_none() {
            out.open(format!("if {source} != nil {{"));
            out.line(format!("{target} = {source}"));
            out.close("}");
        } else {
            out.open(format!("if value, ok := any({source}).({native}); ok {{"));
            out.line(format!("{target} = value"));
            out.close("}");
        }
    }

    /// One assignment per representable field of `reference`
    pub(super) fn decode_fields(
        &mut self,
        out: &mut GoWriter,
        target: &str,
        source: &str,
        reference: &StructRef,
    ) -> Result<()> {
        for field in self.fields(reference)? {
            self.decode(
                out,
                &format!("{target}.{}", field.native),
                false,
                &format!("{source}.Get{}()", field.wire),
                &field.ty,
            )?;
        }
        Ok(())
    }
}

/// Struct pointers keep their absence; the binding is a nilable message pointer
pub(super) fn is_message(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::Struct(reference) if !reference.is_timestamp())
}
