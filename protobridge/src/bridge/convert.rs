//! Conversion code generation state
//!
//! A [`Converter`] writes Go statements that move values between the native service types and
//! the `protoc-gen-go` bindings. It collects the imports those statements need, hands out unique
//! local names, and queues a helper function whenever a struct is re-entered while its own
//! conversion is still being written.

use strum_macros::Display;

use super::naming::{binding_alias, go_camel_case, helper_name};
use super::writer::{GoImports, GoWriter};
use crate::context::GenerationContext;
use crate::descriptor::{QualifiedName, ScalarKind, StructRef, TypeDescriptor};
use crate::emitter::go_package;
use crate::error::Result;
use crate::locator::is_standard_library;
use crate::resolver::{Resolution, message_ref, resolve};
use crate::schema::{MessageRef, ScalarSchema, SchemaType};
use crate::source::default_package_name;

pub(super) const ANYPB_PATH: &str = "google.golang.org/protobuf/types/known/anypb";
pub(super) const PROTO_PATH: &str = "google.golang.org/protobuf/proto";

/// Which way a conversion runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Direction {
    /// Generated bindings to native values
    Decode,
    /// Native values to generated bindings
    Encode,
}

/// A struct conversion emitted as a named function
#[derive(Debug, Clone)]
struct Helper {
    direction: Direction,
    reference: StructRef,
    name:      String,
}

/// An exported, representable struct field with its binding accessor name
#[derive(Debug, Clone)]
pub(super) struct ConvertedField {
    pub native: String,
    pub wire:   String,
    pub ty:     TypeDescriptor,
}

pub(crate) struct Converter<'c> {
    ctx:             &'c mut GenerationContext,
    service_package: String,
    go_package_base: String,
    imports:         GoImports,
    /// Struct conversions currently being written inline
    active:          Vec<(Direction, QualifiedName)>,
    helpers:         Vec<Helper>,
    next_local:      usize,
}

impl<'c> Converter<'c> {
    pub(crate) fn new(
        ctx: &'c mut GenerationContext,
        service_package: &str,
        go_package_base: &str,
    ) -> Self {
        Self {
            ctx,
            service_package: service_package.to_string(),
            go_package_base: go_package_base.to_string(),
            imports: GoImports::new(),
            active: Vec::new(),
            helpers: Vec::new(),
            next_local: 0,
        }
    }

    pub(crate) const fn imports(&mut self) -> &mut GoImports { &mut self.imports }

    pub(crate) fn into_imports(self) -> GoImports { self.imports }

    /// A local name no other generated statement in this file uses
    pub(super) fn local(&mut self, stem: &str) -> String {
        let name = format!("{stem}{}", self.next_local);
        self.next_local += 1;
        name
    }

    /// Import alias of a native package
    pub(crate) fn native_package(&mut self, import_path: &str, go_name: &str) -> String {
        if is_standard_library(import_path) && !import_path.contains('/') {
            self.imports.standard(import_path);
            return import_path.to_string();
        }
        let alias = self.ctx.schema_package(import_path, go_name);
        self.imports.aliased(import_path, &alias);
        alias
    }

    /// Import alias of the generated bindings for schema package `package`
    pub(crate) fn binding_package(&mut self, package: &str) -> String {
        let alias = binding_alias(package);
        let path = go_package(&self.go_package_base, package, &self.service_package);
        self.imports.aliased(&path, &alias);
        alias
    }

    fn named(&mut self, name: &QualifiedName) -> String {
        let go_name = self
            .ctx
            .schema_package_of(&name.package)
            .map_or_else(
                || default_package_name(&name.package).to_string(),
                ToString::to_string,
            );
        let alias = self.native_package(&name.package, &go_name);
        format!("{alias}.{}", name.name)
    }

    pub(crate) fn native_struct(&mut self, reference: &StructRef) -> String {
        let alias = self.native_package(&reference.id.package, &reference.package_name);
        format!("{alias}.{}", reference.id.name)
    }

    /// Go spelling of a native type
    pub(crate) fn native_type(&mut self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Scalar(scalar) => match &scalar.named {
                Some(name) => self.named(name),
                None => scalar.kind.to_string(),
            },
            TypeDescriptor::Pointer(inner) => format!("*{}", self.native_type(inner)),
            TypeDescriptor::Slice(element) => format!("[]{}", self.native_type(element)),
            TypeDescriptor::Array { len, element } => {
                format!("[{len}]{}", self.native_type(element))
            }
            TypeDescriptor::Map { key, value } => {
                format!("map[{}]{}", self.native_type(key), self.native_type(value))
            }
            TypeDescriptor::Struct(reference) => self.native_struct(reference),
            TypeDescriptor::Interface(interface) => match &interface.name {
                None => "any".to_string(),
                Some(name) if *name == QualifiedName::error() => "error".to_string(),
                Some(name) => self.named(name),
            },
            TypeDescriptor::Function => "func()".to_string(),
            TypeDescriptor::Unsupported(description) => description.clone(),
        }
    }

    /// The RPC failure `err` as a value of the method's trailing error type
    ///
    /// A named error interface gets the failure only when the failure satisfies it; the
    /// transport's errors carry nothing but `Error() string`.
    pub(crate) fn rpc_error(&mut self, out: &mut GoWriter, ty: &TypeDescriptor) -> String {
        if ty.is_builtin_error() {
            return "err".to_string();
        }
        let native = self.native_type(ty);
        out.line(format!("fault, _ := any(err).({native})"));
        "fault".to_string()
    }

    /// Zero value of a native type, as a Go expression
    pub(crate) fn zero_value(&mut self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Scalar(scalar) => match scalar.kind {
                ScalarKind::Bool => "false".to_string(),
                ScalarKind::String => "\"\"".to_string(),
                _ => "0".to_string(),
            },
            TypeDescriptor::Struct(_) | TypeDescriptor::Array { .. } => {
                format!("{}{{}}", self.native_type(ty))
            }
            TypeDescriptor::Pointer(_)
            | TypeDescriptor::Slice(_)
            | TypeDescriptor::Map { .. }
            | TypeDescriptor::Interface(_)
            | TypeDescriptor::Function
            | TypeDescriptor::Unsupported(_) => "nil".to_string(),
        }
    }

    /// Go type `protoc-gen-go` uses for a native type, or `None` when it is elided
    pub(crate) fn wire_type(&mut self, ty: &TypeDescriptor) -> Result<Option<String>> {
        Ok(match resolve(self.ctx, ty)? {
            Resolution::Resolved { ty, .. } => Some(self.schema_go_type(&ty)),
            Resolution::Elided => None,
        })
    }

    fn schema_go_type(&mut self, ty: &SchemaType) -> String {
        match ty {
            SchemaType::Scalar(ScalarSchema::Any) => {
                self.imports.aliased(ANYPB_PATH, "anypb");
                ScalarSchema::Any.go_type().to_string()
            }
            SchemaType::Scalar(scalar) => scalar.go_type().to_string(),
            SchemaType::Repeated(inner) => format!("[]{}", self.schema_go_type(inner)),
            SchemaType::Map { key, value } => {
                format!("map[{}]{}", key.go_type(), self.schema_go_type(value))
            }
            SchemaType::Message(reference) => format!("*{}", self.message_type(reference)),
        }
    }

    /// `pbdep.Widget` for a message reference
    pub(crate) fn message_type(&mut self, reference: &MessageRef) -> String {
        let alias = self.binding_package(&reference.package);
        format!("{alias}.{}", go_camel_case(&reference.name))
    }

    pub(super) fn struct_message(&mut self, reference: &StructRef) -> MessageRef {
        message_ref(self.ctx, reference)
    }

    /// Fields a struct conversion copies, in declaration order
    pub(super) fn fields(&mut self, reference: &StructRef) -> Result<Vec<ConvertedField>> {
        let def = self.ctx.struct_def(&reference.id)?;
        Ok(def
            .exported_fields()
            .filter(|field| !field.ty.is_elided())
            .map(|field| ConvertedField {
                native: field.name.clone(),
                wire:   go_camel_case(&field.name),
                ty:     field.ty.clone(),
            })
            .collect())
    }

    pub(super) fn is_active(&self, direction: Direction, id: &QualifiedName) -> bool {
        self.active
            .iter()
            .any(|(active, active_id)| *active == direction && active_id == id)
    }

    pub(super) fn enter(&mut self, direction: Direction, id: &QualifiedName) {
        self.active.push((direction, id.clone()));
    }

    pub(super) fn leave(&mut self) { self.active.pop(); }

    /// Name of the helper converting `reference`, queueing it the first time
    pub(super) fn helper(&mut self, direction: Direction, reference: &StructRef) -> String {
        if let Some(helper) = self
            .helpers
            .iter()
            .find(|helper| helper.direction == direction && helper.reference.id == reference.id)
        {
            return helper.name.clone();
        }
        let message = self.struct_message(reference);
        let name = helper_name(&direction.to_string(), &message.package, &message.name);
        tracing::debug!("Queued conversion helper {name} for {}", reference.id);
        self.helpers.push(Helper {
            direction,
            reference: reference.clone(),
            name: name.clone(),
        });
        name
    }

    /// Write every queued helper, including helpers queued while writing earlier ones
    pub(crate) fn write_helpers(&mut self, out: &mut GoWriter) -> Result<()> {
        let mut index = 0;
        while let Some(helper) = self.helpers.get(index).cloned() {
            index += 1;
            let native = self.native_struct(&helper.reference);
            let message = self.struct_message(&helper.reference);
            let wire = self.message_type(&message);

            out.blank();
            self.enter(helper.direction, &helper.reference.id);
            match helper.direction {
                Direction::Decode => {
                    out.open(format!("func {}(source *{wire}) {native} {{", helper.name));
                    out.line(format!("var target {native}"));
                    self.decode_fields(out, "target", "source", &helper.reference)?;
                }
                Direction::Encode => {
                    out.open(format!("func {}(source {native}) *{wire} {{", helper.name));
                    out.line(format!("target := &{wire}{{}}"));
                    self.encode_fields(out, "target", "source", &helper.reference)?;
                }
            }
            self.leave();
            out.line("return target");
            out.close("}");
        }
        Ok(())
    }
}

/// `target := value` for a fresh binding, `target = value` otherwise
pub(super) fn assign(out: &mut GoWriter, target: &str, declare: bool, value: &str) {
    if declare {
        out.line(format!("{target} := {value}"));
    } else {
        out.line(format!("{target} = {value}"));
    }
}
