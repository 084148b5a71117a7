//! Declaration-level syntax tree for Go source files
//!
//! Only what signature extraction and type lowering need is kept: the package clause, imports,
//! type declarations and function signatures. Bodies and initializers never make it here.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceFile {
    pub path:    PathBuf,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub types:   Vec<TypeSpec>,
    pub funcs:   Vec<FuncDecl>,
}

impl SourceFile {
    pub(crate) fn type_spec(&self, name: &str) -> Option<&TypeSpec> {
        self.types.iter().find(|spec| spec.name == name)
    }

    /// The function or method whose `func` keyword sits on `line`
    pub(crate) fn func_at_line(&self, line: usize) -> Option<&FuncDecl> {
        self.funcs.iter().find(|func| func.line == line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSpec {
    /// Explicit name, `.` or `_` when present
    pub alias: Option<String>,
    pub path:  String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeSpec {
    pub name:     String,
    pub line:     usize,
    /// `type A = B`
    pub alias:    bool,
    /// `type List[T any] ...`
    pub generic:  bool,
    pub ty:       TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FuncDecl {
    pub name:     String,
    /// Line of the `func` keyword
    pub line:     usize,
    pub receiver: Option<Receiver>,
    pub params:   FieldList,
    pub results:  FieldList,
    pub generic:  bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Receiver {
    pub type_name: String,
    pub pointer:   bool,
}

/// A parenthesized parameter or result list, with Go's `a, b int` grouping preserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FieldList {
    pub groups: Vec<FieldGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldGroup {
    /// Empty for an unnamed entry
    pub names: Vec<String>,
    pub ty:    TypeExpr,
}

impl FieldList {
    /// Number of positional entries; an unnamed group counts once
    pub(crate) fn len(&self) -> usize {
        self.groups.iter().map(|group| group.names.len().max(1)).sum()
    }

    pub(crate) fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Last entry is declared `...T`
    pub(crate) fn is_variadic(&self) -> bool {
        self.groups
            .last()
            .is_some_and(|group| matches!(group.ty, TypeExpr::Variadic(_)))
    }

    /// Declared name at a position, `Some(None)` for an unnamed entry, `None` past the end
    pub(crate) fn name_at(&self, index: usize) -> Option<Option<&str>> {
        self.entries().nth(index).map(|(name, _)| name)
    }

    /// Positional `(name, type)` entries with groups expanded
    pub(crate) fn entries(&self) -> impl Iterator<Item = (Option<&str>, &TypeExpr)> {
        self.groups.iter().flat_map(|group| {
            let names: Vec<Option<&str>> = if group.names.is_empty() {
                vec![None]
            } else {
                group.names.iter().map(|name| Some(name.as_str())).collect()
            };
            names.into_iter().map(move |name| (name, &group.ty))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeExpr {
    Name(String),
    Qualified { package: String, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    /// Length kept as source text; `...` for `[...]T`
    Array { len: String, element: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan(Box<TypeExpr>),
    Func(Box<Signature>),
    Struct(Vec<StructField>),
    Interface(InterfaceType),
    Variadic(Box<TypeExpr>),
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
}

impl TypeExpr {
    /// Go-syntax rendering used in diagnostics
    pub(crate) fn display(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Qualified { package, name } => format!("{package}.{name}"),
            Self::Pointer(inner) => format!("*{}", inner.display()),
            Self::Slice(inner) => format!("[]{}", inner.display()),
            Self::Array { len, element } => format!("[{len}]{}", element.display()),
            Self::Map { key, value } => format!("map[{}]{}", key.display(), value.display()),
            Self::Chan(inner) => format!("chan {}", inner.display()),
            Self::Func(_) => "func(...)".to_string(),
            Self::Struct(_) => "struct{...}".to_string(),
            Self::Interface(_) => "interface{...}".to_string(),
            Self::Variadic(inner) => format!("...{}", inner.display()),
            Self::Generic { base, args } => format!(
                "{}[{}]",
                base.display(),
                args.iter().map(Self::display).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub params:  FieldList,
    pub results: FieldList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StructField {
    /// `None` for an embedded field
    pub name: Option<String>,
    pub ty:   TypeExpr,
    pub tag:  Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InterfaceType {
    pub methods:    Vec<InterfaceMethod>,
    pub embeds:     Vec<TypeExpr>,
    /// Contains `~T` or `A | B` terms, so it can only be a constraint
    pub constraint: bool,
}

impl InterfaceType {
    /// Declares `Error() string` directly or embeds `error`
    pub(crate) fn declares_error(&self) -> bool {
        let has_error_method = self.methods.iter().any(|method| {
            method.name == "Error"
                && method.signature.params.is_empty()
                && method.signature.results.len() == 1
                && method
                    .signature
                    .results
                    .entries()
                    .all(|(_, ty)| *ty == TypeExpr::Name("string".to_string()))
        });
        has_error_method
            || self
                .embeds
                .iter()
                .any(|embed| *embed == TypeExpr::Name("error".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfaceMethod {
    pub name:      String,
    pub signature: Signature,
}
