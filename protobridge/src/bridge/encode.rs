//! Native values to bindings

use super::convert::{ANYPB_PATH, Converter, Direction, PROTO_PATH, assign};
use super::writer::GoWriter;
use crate::descriptor::{InterfaceRef, StructRef, TypeDescriptor};
use crate::error::Result;
use crate::schema::ScalarSchema;

impl Converter<'_> {
    /// Write statements storing the binding form of native expression `source` into `target`
    ///
    /// `declare` has the same meaning as for [`Converter::decode`].
    pub(crate) fn encode(
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
                    assign(out, target, declare, &format!("{wire}({source})"));
                }
            }
            TypeDescriptor::Pointer(inner) => {
                if declare {
                    let wire = self.wire_type(ty)?.unwrap_or_default();
                    out.line(format!("var {target} {wire}"));
                }
                out.open(format!("if {source} != nil {{"));
                self.encode(out, target, false, &format!("(*{source})"), inner)?;
                out.close("}");
            }
            TypeDescriptor::Slice(element) if element.is_byte() => {
                assign(out, target, declare, &format!("[]byte({source})"));
            }
            TypeDescriptor::Array { element, .. } if element.is_byte() => {
                assign(out, target, declare, &format!("make([]byte, len({source}))"));
                out.line(format!("copy({target}, {source}[:])"));
            }
            TypeDescriptor::Slice(element) | TypeDescriptor::Array { element, .. } => {
                let wire = self.wire_type(ty)?.unwrap_or_default();
                assign(out, target, declare, &format!("make({wire}, len({source}))"));
                let (index, item) = (self.local("i"), self.local("item"));
                out.open(format!("for {index}, {item} := range {source} {{"));
                self.encode(out, &format!("{target}[{index}]"), false, &item, element)?;
                out.close("}");
            }
            TypeDescriptor::Map { key, value } => {
                let native = self.native_type(ty);
                let wire = self.wire_type(ty)?.unwrap_or_default();
                if wire == native {
                    assign(out, target, declare, source);
                    return Ok(());
                }
                assign(out, target, declare, &format!("make({wire}, len({source}))"));
                let (native_key, native_value) = (self.local("k"), self.local("v"));
                let (wire_key, wire_value) = (self.local("key"), self.local("value"));
                out.open(format!("for {native_key}, {native_value} := range {source} {{"));
                self.encode(out, &wire_key, true, &native_key, key)?;
                self.encode(out, &wire_value, true, &native_value, value)?;
                out.line(format!("{target}[{wire_key}] = {wire_value}"));
                out.close("}");
            }
            TypeDescriptor::Interface(interface) => {
                self.encode_interface(out, target, declare, source, interface);
            }
            TypeDescriptor::Struct(reference) if reference.is_timestamp() => {
                assign(out, target, declare, &format!("{source}.Unix()"));
            }
            TypeDescriptor::Struct(reference) => {
                if self.is_active(Direction::Encode, &reference.id) {
                    let helper = self.helper(Direction::Encode, reference);
                    assign(out, target, declare, &format!("{helper}({source})"));
                    return Ok(());
                }
                let message = self.struct_message(reference);
                let wire = self.message_type(&message);
                assign(out, target, declare, &format!("&{wire}{{}}"));
                self.enter(Direction::Encode, &reference.id);
                let written = self.encode_fields(out, target, source, reference);
                self.leave();
                written?;
            }
            TypeDescriptor::Function | TypeDescriptor::Unsupported(_) => {
                tracing::trace!("No encode statements for {ty}");
            }
        }
        Ok(())
    }

    fn encode_interface(
        &mut self,
        out: &mut GoWriter,
        target: &str,
        declare: bool,
        source: &str,
        interface: &InterfaceRef,
    ) {
        if interface.implements_error {
            if declare {
                out.line(format!("var {target} string"));
            }
            out.open(format!("if {source} != nil {{"));
            out.line(format!("{target} = {source}.Error()"));
            out.close("}");
            return;
        }

        if declare {
            self.imports().aliased(ANYPB_PATH, "anypb");
            out.line(format!("var {target} *anypb.Any"));
        }
        self.imports().aliased(PROTO_PATH, "proto");
        self.imports().aliased(ANYPB_PATH, "anypb");
        out.open(format!("if message, ok := {source}.(proto.Message); ok {{"));
        out.open("if packed, err := anypb.New(message); err == nil {");
        out.line(format!("{target} = packed"));
        out.close("}");
        out.close("}");
    }

    /// One assignment per representable field of `reference`
    pub(super) fn encode_fields(
        &mut self,
        out: &mut GoWriter,
        target: &str,
        source: &str,
        reference: &StructRef,
    ) -> Result<()> {
        for field in self.fields(reference)? {
            self.encode(
                out,
                &format!("{target}.{}", field.wire),
                false,
                &format!("{source}.{}", field.native),
                &field.ty,
            )?;
        }
        Ok(())
    }
}
