//! Type resolution
//!
//! Maps native [`TypeDescriptor`]s to [`SchemaType`]s. Struct types become messages, cached by
//! canonical identity so each is walked and emitted once per run. A struct reached again while
//! its own fields are still being walked resolves to a reference to the message being defined.

mod cache;

use error_stack::{Report, ResultExt};
use serde::Serialize;

pub(crate) use cache::{NameOwner, ResolutionCache};

use crate::context::GenerationContext;
use crate::descriptor::{
    MethodSignature, Parameter, QualifiedName, ServicePackage, StructRef, TypeDescriptor,
};
use crate::error::{Error, Result};
use crate::schema::{Message, MessageField, MessageRef, ScalarSchema, SchemaType};

/// Outcome of resolving one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Resolved {
        ty:           SchemaType,
        /// Struct messages completed while resolving this type, in completion order
        dependencies: Vec<MessageRef>,
    },
    /// Reachable only through a function type; the field is dropped
    Elided,
}

/// A method with its request and response messages
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResolvedMethod {
    pub signature:    MethodSignature,
    pub request:      Message,
    pub response:     Message,
    pub dependencies: Vec<MessageRef>,
}

impl ResolvedMethod {
    pub(crate) fn request_name(&self) -> &str { &self.request.name }

    pub(crate) fn response_name(&self) -> &str { &self.response.name }
}

pub(crate) fn resolve(ctx: &mut GenerationContext, ty: &TypeDescriptor) -> Result<Resolution> {
    let before = ctx.cache().len();
    Ok(match resolve_type(ctx, ty)? {
        Some(ty) => Resolution::Resolved {
            ty,
            dependencies: ctx.cache().completed_since(before),
        },
        None => Resolution::Elided,
    })
}

fn resolve_type(ctx: &mut GenerationContext, ty: &TypeDescriptor) -> Result<Option<SchemaType>> {
    match ty {
        TypeDescriptor::Pointer(inner) => resolve_type(ctx, inner),
        TypeDescriptor::Slice(element) | TypeDescriptor::Array { element, .. } => {
            if element.is_byte() {
                return Ok(Some(SchemaType::Scalar(ScalarSchema::Bytes)));
            }
            match resolve_type(ctx, element)? {
                Some(inner) if inner.is_repeated() => {
                    Err(Report::new(Error::NestedRepeated(ty.to_string())))
                }
                Some(inner) => Ok(Some(SchemaType::Repeated(Box::new(inner)))),
                None => Ok(None),
            }
        }
        TypeDescriptor::Map { key, value } => {
            let (Some(key_schema), Some(value_schema)) =
                (resolve_type(ctx, key)?, resolve_type(ctx, value)?)
            else {
                return Ok(None);
            };
            let SchemaType::Scalar(key_scalar) = key_schema else {
                return Err(Report::new(Error::UnsupportedMapKey(key.to_string())));
            };
            if !key_scalar.is_valid_map_key() {
                return Err(Report::new(Error::UnsupportedMapKey(key.to_string())));
            }
            if value_schema.is_repeated() {
                return Err(Report::new(Error::NestedRepeated(ty.to_string())));
            }
            Ok(Some(SchemaType::Map {
                key:   key_scalar,
                value: Box::new(value_schema),
            }))
        }
        TypeDescriptor::Interface(interface) => Ok(Some(SchemaType::Scalar(
            if interface.implements_error {
                ScalarSchema::String
            } else {
                ScalarSchema::Any
            },
        ))),
        TypeDescriptor::Struct(reference) if reference.is_timestamp() => {
            Ok(Some(SchemaType::Scalar(ScalarSchema::Int64)))
        }
        TypeDescriptor::Struct(reference) => {
            Ok(Some(SchemaType::Message(resolve_struct(ctx, reference)?)))
        }
        TypeDescriptor::Scalar(scalar) => {
            Ok(Some(SchemaType::Scalar(ScalarSchema::for_kind(scalar.kind))))
        }
        TypeDescriptor::Function => Ok(None),
        TypeDescriptor::Unsupported(description) => {
            Err(Report::new(Error::UnknownType(description.clone())))
        }
    }
}

/// Schema package and message name a struct is emitted under
pub(crate) fn message_ref(ctx: &mut GenerationContext, reference: &StructRef) -> MessageRef {
    MessageRef {
        id:      reference.id.clone(),
        package: ctx.schema_package(&reference.id.package, &reference.package_name),
        name:    reference.id.name.clone(),
    }
}

fn resolve_struct(ctx: &mut GenerationContext, reference: &StructRef) -> Result<MessageRef> {
    let message = message_ref(ctx, reference);
    if ctx.cache().is_known(&reference.id) {
        tracing::trace!(
            "Cache hit for {}{}",
            reference.id,
            if ctx.cache().is_in_progress(&reference.id) {
                " (forward reference)"
            } else {
                ""
            }
        );
        return Ok(message);
    }

    ctx.cache_mut().claim_name(
        &message.package,
        &message.name,
        NameOwner::Struct(reference.id.clone()),
    )?;
    ctx.cache_mut().begin(&reference.id);

    let def = ctx.struct_def(&reference.id)?;
    let mut fields = Vec::new();
    for field in def.exported_fields() {
        let resolved = resolve_type(ctx, &field.ty)
            .attach(format!("field {} of {}, type {}", field.name, reference.id, field.ty))?;
        match resolved {
            Some(ty) => fields.push(MessageField {
                name: field.name.clone(),
                ty,
                number: next_number(&fields),
            }),
            None => tracing::warn!(
                "Eliding field {}.{} of function type {}",
                reference.id.name,
                field.name,
                field.ty
            ),
        }
    }

    tracing::debug!(
        "Resolved {} into message {}.{} with {} fields",
        reference.id,
        message.package,
        message.name,
        fields.len()
    );
    ctx.cache_mut().finish(Message::new(
        reference.id.clone(),
        message.package.clone(),
        message.name.clone(),
        fields,
    ));
    Ok(message)
}

fn next_number(fields: &[MessageField]) -> u32 {
    u32::try_from(fields.len()).map_or(u32::MAX, |count| count.saturating_add(1))
}

/// Resolve one method's request and response messages in `service`'s schema package
pub(crate) fn resolve_method(
    ctx: &mut GenerationContext,
    service: &ServicePackage,
    signature: &MethodSignature,
) -> Result<ResolvedMethod> {
    let before = ctx.cache().len();
    let package = ctx.schema_package(&service.import_path, &service.name);

    let request = method_message(
        ctx,
        service,
        &package,
        signature,
        "Request",
        signature.request_params(),
    )?;
    let response = method_message(
        ctx,
        service,
        &package,
        signature,
        "Response",
        signature.response_results(),
    )?;

    Ok(ResolvedMethod {
        signature: signature.clone(),
        request,
        response,
        dependencies: ctx.cache().completed_since(before),
    })
}

fn method_message(
    ctx: &mut GenerationContext,
    service: &ServicePackage,
    package: &str,
    signature: &MethodSignature,
    suffix: &str,
    entries: &[Parameter],
) -> Result<Message> {
    let name = format!("{}{suffix}", signature.name);
    ctx.cache_mut()
        .claim_name(package, &name, NameOwner::Method(signature.name.clone()))?;

    let mut fields = Vec::with_capacity(entries.len());
    for entry in entries {
        let resolved = resolve_type(ctx, &entry.ty).attach(format!(
            "method {}, field {}, type {}",
            signature.name, entry.name, entry.ty
        ))?;
        match resolved {
            Some(ty) => fields.push(MessageField {
                name: entry.name.clone(),
                ty,
                number: next_number(&fields),
            }),
            None => tracing::warn!(
                "Eliding {} of {name}: function type {}",
                entry.name,
                entry.ty
            ),
        }
    }

    Ok(Message::new(
        QualifiedName::new(&service.module, &service.import_path, &name),
        package.to_string(),
        name,
        fields,
    ))
}
