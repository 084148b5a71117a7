//! Lowering of Go type expressions into [`TypeDescriptor`]s
//!
//! A type expression only means something in the scope of the file it was written in: the file's
//! imports decide what a package qualifier refers to and the file's package decides what a bare
//! name refers to. [`Lowerer`] carries that scope while it walks the expression, loading other
//! packages through the [`SourceLoader`] whenever a qualifier points outside the current one.

use std::rc::Rc;
use std::str::FromStr;

use error_stack::{Report, ResultExt};

use super::loader::{Package, SourceLoader};
use crate::descriptor::{
    FieldDescriptor, InterfaceRef, QualifiedName, ScalarKind, ScalarType, StructDef, StructRef,
    TypeDescriptor, Visibility,
};
use crate::error::{Error, Result};
use crate::go_syntax::ast::{InterfaceType, SourceFile, TypeExpr};

pub(crate) struct Lowerer<'l> {
    loader: &'l mut SourceLoader,
    /// Named non-struct types currently being expanded, to stop `type T []T`
    named:  Vec<QualifiedName>,
}

impl<'l> Lowerer<'l> {
    pub(crate) const fn new(loader: &'l mut SourceLoader) -> Self {
        Self {
            loader,
            named: Vec::new(),
        }
    }

    /// Lower `expr` as written in `file`, a member of `package`
    pub(crate) fn lower(
        &mut self,
        package: &Rc<Package>,
        file: &SourceFile,
        expr: &TypeExpr,
    ) -> Result<TypeDescriptor> {
        match expr {
            TypeExpr::Name(name) => self.lower_name(package, file, name),
            TypeExpr::Qualified {
                package: qualifier,
                name,
            } => self.lower_qualified(package, file, qualifier, name),
            TypeExpr::Pointer(inner) => Ok(TypeDescriptor::pointer(
                self.lower(package, file, inner)?,
            )),
            TypeExpr::Slice(element) | TypeExpr::Variadic(element) => Ok(TypeDescriptor::slice(
                self.lower(package, file, element)?,
            )),
            TypeExpr::Array { len, element } => {
                let element = self.lower(package, file, element)?;
                Ok(match parse_int_literal(len) {
                    Some(len) => TypeDescriptor::Array {
                        len,
                        element: Box::new(element),
                    },
                    None => TypeDescriptor::Unsupported(format!("[{len}]{element}")),
                })
            }
            TypeExpr::Map { key, value } => Ok(TypeDescriptor::map(
                self.lower(package, file, key)?,
                self.lower(package, file, value)?,
            )),
            TypeExpr::Func(_) => Ok(TypeDescriptor::Function),
            TypeExpr::Interface(interface) => Ok(TypeDescriptor::Interface(InterfaceRef {
                name:             None,
                implements_error: self.implements_error(package, file, interface),
            })),
            TypeExpr::Struct(_) => Ok(TypeDescriptor::Unsupported(format!(
                "anonymous {}",
                expr.display()
            ))),
            TypeExpr::Chan(_) | TypeExpr::Generic { .. } => {
                Ok(TypeDescriptor::Unsupported(expr.display()))
            }
        }
    }

    fn lower_name(
        &mut self,
        package: &Rc<Package>,
        file: &SourceFile,
        name: &str,
    ) -> Result<TypeDescriptor> {
        if package.type_spec(name).is_some() {
            return self.lower_named(package, name);
        }
        if let Some(builtin) = builtin(name) {
            return Ok(builtin);
        }

        for import in file
            .imports
            .iter()
            .filter(|import| import.alias.as_deref() == Some("."))
        {
            let imported = self.loader.import(&import.path, &package.dir)?;
            if imported.type_spec(name).is_some() {
                return self.lower_named(&imported, name);
            }
        }

        Err(Report::new(Error::TypeNotFound(format!(
            "{name} in package {}",
            package.import_path
        ))))
    }

    fn lower_qualified(
        &mut self,
        package: &Rc<Package>,
        file: &SourceFile,
        qualifier: &str,
        name: &str,
    ) -> Result<TypeDescriptor> {
        let import_path = self.import_path(package, file, qualifier)?;
        match (import_path.as_str(), name) {
            ("time", "Time") => return Ok(TypeDescriptor::time()),
            ("context", "Context") => return Ok(TypeDescriptor::context()),
            _ => {}
        }

        let imported = self
            .loader
            .import(&import_path, &package.dir)
            .attach(format!("referenced as {qualifier}.{name} in {}", file.path.display()))?;
        if imported.type_spec(name).is_none() {
            return Err(Report::new(Error::TypeNotFound(format!(
                "{name} in package {import_path}"
            ))));
        }
        self.lower_named(&imported, name)
    }

    /// Import path a package qualifier refers to inside `file`
    fn import_path(
        &mut self,
        package: &Rc<Package>,
        file: &SourceFile,
        qualifier: &str,
    ) -> Result<String> {
        if let Some(import) = file
            .imports
            .iter()
            .find(|import| import.alias.as_deref() == Some(qualifier))
        {
            return Ok(import.path.clone());
        }

        let unaliased = || file.imports.iter().filter(|import| import.alias.is_none());
        if let Some(import) =
            unaliased().find(|import| default_package_name(&import.path) == qualifier)
        {
            return Ok(import.path.clone());
        }

        // Package names need not match the import path; fall back to reading the clause
        let candidates: Vec<String> = unaliased().map(|import| import.path.clone()).collect();
        for path in candidates {
            match self.loader.import(&path, &package.dir) {
                Ok(imported) if imported.name == qualifier => return Ok(path),
                Ok(_) => {}
                Err(error) => {
                    tracing::trace!(
                        "Skipping import {path} while resolving {qualifier}: {error:?}"
                    );
                }
            }
        }

        Err(Report::new(Error::TypeNotFound(format!(
            "no import in {} provides package {qualifier}",
            file.path.display()
        ))))
    }

    fn lower_named(&mut self, package: &Rc<Package>, name: &str) -> Result<TypeDescriptor> {
        let id = package.qualified(name);
        let Some((file, spec)) = package.type_spec(name) else {
            return Err(Report::new(Error::TypeNotFound(id.to_string())));
        };
        if spec.generic {
            return Ok(TypeDescriptor::Unsupported(format!("generic type {id}")));
        }

        match &spec.ty {
            TypeExpr::Struct(_) if !spec.alias => Ok(TypeDescriptor::Struct(StructRef {
                id,
                package_name: package.name.clone(),
            })),
            TypeExpr::Interface(interface) if !spec.alias => {
                Ok(TypeDescriptor::Interface(InterfaceRef {
                    implements_error: self.implements_error(package, &file, interface),
                    name:             Some(id),
                }))
            }
            underlying => {
                if self.named.contains(&id) {
                    return Ok(TypeDescriptor::Unsupported(format!("recursive type {id}")));
                }
                self.named.push(id.clone());
                let lowered = self.lower(package, &file, underlying);
                self.named.pop();

                match lowered? {
                    lowered if spec.alias => Ok(lowered),
                    TypeDescriptor::Scalar(scalar) => Ok(TypeDescriptor::Scalar(ScalarType {
                        kind:  scalar.kind,
                        named: Some(id),
                    })),
                    TypeDescriptor::Struct(reference) if !reference.is_timestamp() => {
                        Ok(TypeDescriptor::Struct(StructRef {
                            id,
                            package_name: package.name.clone(),
                        }))
                    }
                    lowered => Ok(lowered),
                }
            }
        }
    }

    /// Declares `Error() string`, or embeds an interface that does
    fn implements_error(
        &mut self,
        package: &Rc<Package>,
        file: &SourceFile,
        interface: &InterfaceType,
    ) -> bool {
        if interface.declares_error() {
            return true;
        }
        interface.embeds.iter().any(|embed| {
            matches!(
                self.lower(package, file, embed),
                Ok(TypeDescriptor::Interface(InterfaceRef {
                    implements_error: true,
                    ..
                }))
            )
        })
    }

    /// Field list of the struct named by `id`, loading its package when needed
    pub(crate) fn struct_def(&mut self, id: &QualifiedName) -> Result<StructDef> {
        let package = self.loader.package(&id.package)?;
        let Some((file, spec)) = package.type_spec(&id.name) else {
            return Err(Report::new(Error::TypeNotFound(id.to_string())));
        };

        let TypeExpr::Struct(fields) = &spec.ty else {
            // `type Admin User`: same fields as the underlying struct, distinct identity
            return match self.lower(&package, &file, &spec.ty)? {
                TypeDescriptor::Struct(underlying) if underlying.id != *id => {
                    let fields = self.struct_def(&underlying.id)?.fields;
                    Ok(StructDef {
                        id: id.clone(),
                        fields,
                    })
                }
                other => Err(Report::new(Error::TypeNotFound(format!(
                    "{id} is {other}, not a struct"
                )))),
            };
        };

        let mut lowered = Vec::with_capacity(fields.len());
        for field in fields {
            let embedded = field.name.is_none();
            let name = field
                .name
                .clone()
                .or_else(|| embedded_name(&field.ty))
                .ok_or_else(|| {
                    Report::new(Error::TypeNotFound(format!(
                        "embedded field {} in {id}",
                        field.ty.display()
                    )))
                })?;
            let visibility = Visibility::of(&name);
            let ty = if visibility == Visibility::Exported {
                self.lower(&package, &file, &field.ty)
                    .attach(format!("field {name} of {id}"))?
            } else {
                TypeDescriptor::Unsupported(field.ty.display())
            };
            lowered.push(FieldDescriptor {
                name,
                ty,
                visibility,
                embedded,
            });
        }

        tracing::trace!("Lowered struct {id} with {} fields", lowered.len());
        Ok(StructDef {
            id:     id.clone(),
            fields: lowered,
        })
    }
}

fn builtin(name: &str) -> Option<TypeDescriptor> {
    match name {
        "byte" => Some(TypeDescriptor::scalar(ScalarKind::Uint8)),
        "rune" => Some(TypeDescriptor::scalar(ScalarKind::Int32)),
        "error" => Some(TypeDescriptor::error()),
        "any" => Some(TypeDescriptor::Interface(InterfaceRef {
            name:             None,
            implements_error: false,
        })),
        "uintptr" | "complex64" | "complex128" => {
            Some(TypeDescriptor::Unsupported(name.to_string()))
        }
        other => ScalarKind::from_str(other).ok().map(TypeDescriptor::scalar),
    }
}

/// The package name Go assumes for an import path: the last element without a major-version
/// suffix (`/v2` or `gopkg.in` style `.v3`)
pub(crate) fn default_package_name(import_path: &str) -> &str {
    let mut segments = import_path.rsplit('/');
    let last = segments.next().unwrap_or(import_path);
    let is_major = |segment: &str| {
        segment
            .strip_prefix('v')
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    };
    let last = match segments.next() {
        Some(parent) if is_major(last) => parent,
        _ => last,
    };
    match last.rsplit_once('.') {
        Some((stem, suffix)) if is_major(suffix) => stem,
        _ => last,
    }
}

fn embedded_name(expr: &TypeExpr) -> Option<String> {
    match expr {
        TypeExpr::Name(name) | TypeExpr::Qualified { name, .. } => Some(name.clone()),
        TypeExpr::Pointer(inner) => embedded_name(inner),
        TypeExpr::Generic { base, .. } => embedded_name(base),
        _ => None,
    }
}

/// Value of a Go integer literal such as `16`, `0x10`, `0o20`, `020` or `1_000`
fn parse_int_literal(literal: &str) -> Option<u64> {
    let digits = literal.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(binary) = lower.strip_prefix("0b") {
        u64::from_str_radix(binary, 2).ok()
    } else if let Some(octal) = lower.strip_prefix("0o") {
        u64::from_str_radix(octal, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}
