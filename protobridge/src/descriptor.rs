//! Native type descriptors
//!
//! [`TypeDescriptor`] is the closed set of Go type shapes the resolver and the conversion
//! generator dispatch over. Struct types are referenced by [`QualifiedName`] and their fields live
//! in the run's type table, so self-referential types need no special representation here.

use std::fmt;
use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Error, Result};

/// Module path recorded for standard-library and builtin types
pub(crate) const STD_MODULE: &str = "std";

/// Canonical identity of a named type: (module, package import path, type name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) struct QualifiedName {
    pub module:  String,
    pub package: String,
    pub name:    String,
}

impl QualifiedName {
    pub(crate) fn new(
        module: impl Into<String>,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module:  module.into(),
            package: package.into(),
            name:    name.into(),
        }
    }

    pub(crate) fn time() -> Self { Self::new(STD_MODULE, "time", "Time") }

    pub(crate) fn context() -> Self { Self::new(STD_MODULE, "context", "Context") }

    pub(crate) fn error() -> Self { Self::new(STD_MODULE, "", "error") }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Go scalar kinds, named the way Go spells them
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScalarKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

/// A scalar, remembering the declared name when it is a named type such as `type Status int32`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct ScalarType {
    pub kind:  ScalarKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named: Option<QualifiedName>,
}

/// Reference to a struct type; its fields are looked up through the type table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct StructRef {
    pub id:           QualifiedName,
    /// Name from the package clause, used as the qualifier in generated Go code
    pub package_name: String,
}

impl StructRef {
    pub(crate) fn is_timestamp(&self) -> bool { self.id == QualifiedName::time() }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct InterfaceRef {
    /// `None` for an inline `interface{...}` or `any`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:             Option<QualifiedName>,
    pub implements_error: bool,
}

/// Native Go type handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub(crate) enum TypeDescriptor {
    Scalar(ScalarType),
    Pointer(Box<TypeDescriptor>),
    Slice(Box<TypeDescriptor>),
    Array {
        len:     u64,
        element: Box<TypeDescriptor>,
    },
    Map {
        key:   Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Struct(StructRef),
    Interface(InterfaceRef),
    Function,
    /// Any kind without a schema representation, described in Go syntax
    Unsupported(String),
}

impl TypeDescriptor {
    pub(crate) const fn scalar(kind: ScalarKind) -> Self {
        Self::Scalar(ScalarType { kind, named: None })
    }

    pub(crate) fn error() -> Self {
        Self::Interface(InterfaceRef {
            name:             Some(QualifiedName::error()),
            implements_error: true,
        })
    }

    pub(crate) fn context() -> Self {
        Self::Interface(InterfaceRef {
            name:             Some(QualifiedName::context()),
            implements_error: false,
        })
    }

    pub(crate) fn time() -> Self {
        Self::Struct(StructRef {
            id:           QualifiedName::time(),
            package_name: "time".to_string(),
        })
    }

    pub(crate) fn pointer(inner: Self) -> Self { Self::Pointer(Box::new(inner)) }

    pub(crate) fn slice(element: Self) -> Self { Self::Slice(Box::new(element)) }

    pub(crate) fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key:   Box::new(key),
            value: Box::new(value),
        }
    }

    /// Any interface whose method set includes `Error() string`
    pub(crate) const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Interface(InterfaceRef {
                implements_error: true,
                ..
            })
        )
    }

    /// Exactly the predeclared `error` interface
    pub(crate) fn is_builtin_error(&self) -> bool {
        matches!(
            self,
            Self::Interface(InterfaceRef { name: Some(name), .. }) if *name == QualifiedName::error()
        )
    }

    pub(crate) fn is_context(&self) -> bool {
        matches!(
            self,
            Self::Interface(InterfaceRef { name: Some(name), .. })
                if *name == QualifiedName::context()
        )
    }

    /// `uint8`/`byte`, the element kind that turns a sequence into `bytes`
    pub(crate) const fn is_byte(&self) -> bool {
        matches!(
            self,
            Self::Scalar(ScalarType {
                kind: ScalarKind::Uint8,
                ..
            })
        )
    }

    /// Reachable only through a function type, so it is dropped instead of represented
    pub(crate) fn is_elided(&self) -> bool {
        match self {
            Self::Function => true,
            Self::Pointer(inner) | Self::Slice(inner) | Self::Array { element: inner, .. } => {
                inner.is_elided()
            }
            Self::Map { key, value } => key.is_elided() || value.is_elided(),
            Self::Scalar(_) | Self::Struct(_) | Self::Interface(_) | Self::Unsupported(_) => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ScalarType {
                named: Some(name), ..
            }) => write!(f, "{}", name.name),
            Self::Scalar(ScalarType { kind, .. }) => write!(f, "{kind}"),
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Slice(element) => write!(f, "[]{element}"),
            Self::Array { len, element } => write!(f, "[{len}]{element}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Struct(reference) => {
                write!(f, "{}.{}", reference.package_name, reference.id.name)
            }
            Self::Interface(InterfaceRef {
                name: Some(name), ..
            }) => write!(f, "{name}"),
            Self::Interface(InterfaceRef { name: None, .. }) => write!(f, "interface{{}}"),
            Self::Function => write!(f, "func"),
            Self::Unsupported(description) => write!(f, "{description}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Visibility {
    Exported,
    Unexported,
}

impl Visibility {
    /// Go's rule: an identifier is exported when it starts with an upper-case letter
    pub(crate) fn of(name: &str) -> Self {
        if name.chars().next().is_some_and(char::is_uppercase) {
            Self::Exported
        } else {
            Self::Unexported
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FieldDescriptor {
    pub name:       String,
    pub ty:         TypeDescriptor,
    pub visibility: Visibility,
    #[serde(default)]
    pub embedded:   bool,
}

/// Field list of one struct type, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StructDef {
    pub id:     QualifiedName,
    pub fields: Vec<FieldDescriptor>,
}

impl StructDef {
    pub(crate) fn exported_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.visibility == Visibility::Exported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Parameter {
    pub name: String,
    pub ty:   TypeDescriptor,
}

/// A service method with names recovered from source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MethodSignature {
    pub name:                 String,
    pub params:               Vec<Parameter>,
    pub results:              Vec<Parameter>,
    pub last_result_is_error: bool,
    /// First parameter is `context.Context`
    pub accepts_context:      bool,
    /// Last parameter is declared `...T`; its type is the slice `[]T`
    pub variadic:             bool,
}

impl MethodSignature {
    pub(crate) fn new(name: String, params: Vec<Parameter>, results: Vec<Parameter>) -> Self {
        let last_result_is_error = results.last().is_some_and(|result| result.ty.is_error());
        let accepts_context = params.first().is_some_and(|param| param.ty.is_context());
        Self {
            name,
            params,
            results,
            last_result_is_error,
            accepts_context,
            variadic: false,
        }
    }

    pub(crate) const fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    /// Parameters carried in the request message
    pub(crate) fn request_params(&self) -> &[Parameter] {
        if self.accepts_context {
            &self.params[1..]
        } else {
            &self.params
        }
    }

    /// Results carried in the response message
    pub(crate) fn response_results(&self) -> &[Parameter] {
        if self.last_result_is_error {
            &self.results[..self.results.len() - 1]
        } else {
            &self.results
        }
    }
}

/// Package a service type is declared in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ServicePackage {
    pub module:      String,
    pub import_path: String,
    /// Name from the package clause
    pub name:        String,
    pub dir:         PathBuf,
}

/// Runtime view of one method: types without names, plus where it is declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MethodDescriptor {
    pub name:     String,
    pub file:     PathBuf,
    /// Line of the declaration's `func` keyword
    pub line:     usize,
    pub params:   Vec<TypeDescriptor>,
    pub results:  Vec<TypeDescriptor>,
    /// Last parameter is declared `...T`
    #[serde(default)]
    pub variadic: bool,
}

/// A service type and its exported method set, ordered by method name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ServiceDescriptor {
    pub name:    String,
    pub package: ServicePackage,
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Read a descriptor written as JSON, for instance by a reflection helper on the Go side
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|error| Report::new(Error::io_failed("read descriptor", path, error)))?;
        let descriptor: Self = serde_json::from_str(&contents)
            .map_err(|error| Report::new(Error::InvalidDescriptor(error.to_string())))
            .attach(format!("descriptor file: {}", path.display()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if Visibility::of(&self.name) != Visibility::Exported {
            return Err(Report::new(Error::InvalidDescriptor(format!(
                "service type {:?} is not exported",
                self.name
            ))));
        }
        if self.package.name.is_empty() || self.package.import_path.is_empty() {
            return Err(Report::new(Error::InvalidDescriptor(
                "package name and import path are required".to_string(),
            )));
        }
        for pair in self.methods.windows(2) {
            if pair[0].name >= pair[1].name {
                return Err(Report::new(Error::InvalidDescriptor(format!(
                    "methods must be sorted by name without repeats, found {} before {}",
                    pair[0].name, pair[1].name
                ))));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn param(name: &str, ty: TypeDescriptor) -> Parameter {
        Parameter {
            name: name.to_string(),
            ty,
        }
    }

    #[test]
    fn test_scalar_kind_from_go_name() {
        assert_eq!(ScalarKind::from_str("uint16").unwrap(), ScalarKind::Uint16);
        assert_eq!(ScalarKind::from_str("float64").unwrap(), ScalarKind::Float64);
        assert_eq!(ScalarKind::Int8.to_string(), "int8");
        assert!(ScalarKind::from_str("complex64").is_err());
    }

    #[test]
    fn test_elision_propagates_through_containers() {
        assert!(TypeDescriptor::Function.is_elided());
        assert!(TypeDescriptor::slice(TypeDescriptor::Function).is_elided());
        assert!(
            TypeDescriptor::map(
                TypeDescriptor::scalar(ScalarKind::String),
                TypeDescriptor::pointer(TypeDescriptor::Function),
            )
            .is_elided()
        );
        assert!(!TypeDescriptor::Unsupported("chan int".to_string()).is_elided());
    }

    #[test]
    fn test_method_flags() {
        let method = MethodSignature::new(
            "Login".to_string(),
            vec![
                param("ctx", TypeDescriptor::context()),
                param("name", TypeDescriptor::scalar(ScalarKind::String)),
            ],
            vec![
                param("token", TypeDescriptor::scalar(ScalarKind::String)),
                param("err", TypeDescriptor::error()),
            ],
        );
        assert!(method.accepts_context);
        assert!(method.last_result_is_error);
        assert_eq!(method.request_params().len(), 1);
        assert_eq!(method.response_results().len(), 1);
        assert_eq!(method.response_results()[0].name, "token");
    }

    #[test]
    fn test_named_error_interface_is_trailing_error() {
        let fault = TypeDescriptor::Interface(InterfaceRef {
            name:             Some(QualifiedName::new(
                "example.org/app",
                "example.org/app/calc",
                "Fault",
            )),
            implements_error: true,
        });
        let method = MethodSignature::new(
            "Name".to_string(),
            Vec::new(),
            vec![
                param("unnamed0", TypeDescriptor::scalar(ScalarKind::String)),
                param("err", fault),
            ],
        );
        assert!(method.last_result_is_error);
        assert_eq!(method.response_results().len(), 1);
        assert_eq!(method.response_results()[0].name, "unnamed0");
    }

    #[test]
    fn test_variadic_defaults_to_false_in_json() {
        let json = r#"{"name": "Sum", "file": "calc.go", "line": 3, "params": [], "results": []}"#;
        let method: MethodDescriptor = serde_json::from_str(json).unwrap();
        assert!(!method.variadic);
    }

    #[test]
    fn test_display_uses_go_syntax() {
        let widget = TypeDescriptor::Struct(StructRef {
            id:           QualifiedName::new("example.org/dep", "example.org/dep", "Widget"),
            package_name: "dep".to_string(),
        });
        let ty = TypeDescriptor::map(
            TypeDescriptor::scalar(ScalarKind::String),
            TypeDescriptor::slice(TypeDescriptor::pointer(widget)),
        );
        assert_eq!(ty.to_string(), "map[string][]*dep.Widget");
        assert_eq!(TypeDescriptor::error().to_string(), "error");
    }

    #[test]
    fn test_service_descriptor_validation() {
        let method = |name: &str| MethodDescriptor {
            name:     name.to_string(),
            file:     PathBuf::from("service.go"),
            line:     1,
            params:   Vec::new(),
            results:  Vec::new(),
            variadic: false,
        };
        let mut service = ServiceDescriptor {
            name:    "Account".to_string(),
            package: ServicePackage {
                module:      "example.org/app".to_string(),
                import_path: "example.org/app/account".to_string(),
                name:        "account".to_string(),
                dir:         PathBuf::from("account"),
            },
            methods: vec![method("Login"), method("Logout")],
        };
        assert!(service.validate().is_ok());

        service.methods.reverse();
        let error = service.validate().unwrap_err();
        assert!(matches!(error.current_context(), Error::InvalidDescriptor(_)));

        service.methods.clear();
        service.name = "account".to_string();
        assert!(service.validate().is_err());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let ty = TypeDescriptor::slice(TypeDescriptor::scalar(ScalarKind::Uint8));
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["kind"], "slice");
        assert_eq!(json["of"]["kind"], "scalar");
        let back: TypeDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, ty);
    }
}
