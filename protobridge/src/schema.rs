//! Resolved schema types
//!
//! [`SchemaType`] is what the resolver produces for a native type descriptor and what both the
//! schema emitter and the conversion generator consume, so the two can never disagree about field
//! names, numbers or order.

use itertools::Itertools;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::descriptor::{QualifiedName, ScalarKind};

/// Fully qualified name of the open placeholder type
pub(crate) const ANY_TYPE: &str = "google.protobuf.Any";
/// Import that declares [`ANY_TYPE`]
pub(crate) const ANY_IMPORT: &str = "google/protobuf/any.proto";

/// proto3 scalar value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScalarSchema {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    #[strum(serialize = "google.protobuf.Any")]
    Any,
}

impl ScalarSchema {
    /// Fixed bucket for a Go scalar kind; `int` and `uint` count as 32-bit
    pub(crate) const fn for_kind(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool,
            ScalarKind::Int | ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 => {
                Self::Int32
            }
            ScalarKind::Int64 => Self::Int64,
            ScalarKind::Uint | ScalarKind::Uint8 | ScalarKind::Uint16 | ScalarKind::Uint32 => {
                Self::Uint32
            }
            ScalarKind::Uint64 => Self::Uint64,
            ScalarKind::Float32 => Self::Float,
            ScalarKind::Float64 => Self::Double,
            ScalarKind::String => Self::String,
        }
    }

    /// Types proto3 accepts as map keys
    pub(crate) const fn is_valid_map_key(self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Uint32 | Self::Uint64 | Self::Bool | Self::String
        )
    }

    /// Go type `protoc-gen-go` generates for this scalar
    pub(crate) const fn go_type(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float32",
            Self::Double => "float64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "[]byte",
            Self::Any => "*anypb.Any",
        }
    }
}

/// Reference to a message by identity and by schema-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub(crate) struct MessageRef {
    pub id:      QualifiedName,
    /// Schema package the message is emitted into
    pub package: String,
    pub name:    String,
}

impl MessageRef {
    /// Name as written from inside `current_package`
    pub(crate) fn render(&self, current_package: &str) -> String {
        if self.package == current_package {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub(crate) enum SchemaType {
    Scalar(ScalarSchema),
    Repeated(Box<SchemaType>),
    Map {
        key:   ScalarSchema,
        value: Box<SchemaType>,
    },
    Message(MessageRef),
}

impl SchemaType {
    /// `repeated` and `map` fields cannot nest inside either
    pub(crate) const fn is_repeated(&self) -> bool {
        matches!(self, Self::Repeated(_) | Self::Map { .. })
    }

    pub(crate) fn uses_any(&self) -> bool {
        match self {
            Self::Scalar(scalar) => *scalar == ScalarSchema::Any,
            Self::Repeated(inner) | Self::Map { value: inner, .. } => inner.uses_any(),
            Self::Message(_) => false,
        }
    }

    /// Message referenced at the leaf, if any
    pub(crate) fn message(&self) -> Option<&MessageRef> {
        match self {
            Self::Message(reference) => Some(reference),
            Self::Repeated(inner) | Self::Map { value: inner, .. } => inner.message(),
            Self::Scalar(_) => None,
        }
    }

    pub(crate) fn render(&self, current_package: &str) -> String {
        match self {
            Self::Scalar(scalar) => scalar.to_string(),
            Self::Repeated(inner) => format!("repeated {}", inner.render(current_package)),
            Self::Map { key, value } => format!("map<{key}, {}>", value.render(current_package)),
            Self::Message(reference) => reference.render(current_package),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MessageField {
    pub name:   String,
    pub ty:     SchemaType,
    pub number: u32,
}

/// One `message` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Message {
    pub id:           QualifiedName,
    pub package:      String,
    pub name:         String,
    pub fields:       Vec<MessageField>,
    /// Messages the fields reference, in field order without repeats
    pub dependencies: Vec<MessageRef>,
}

impl Message {
    pub(crate) fn new(
        id: QualifiedName,
        package: String,
        name: String,
        fields: Vec<MessageField>,
    ) -> Self {
        let dependencies = fields
            .iter()
            .filter_map(|field| field.ty.message())
            .unique()
            .cloned()
            .collect();
        Self {
            id,
            package,
            name,
            fields,
            dependencies,
        }
    }

    pub(crate) fn reference(&self) -> MessageRef {
        MessageRef {
            id:      self.id.clone(),
            package: self.package.clone(),
            name:    self.name.clone(),
        }
    }

    pub(crate) fn uses_any(&self) -> bool { self.fields.iter().any(|field| field.ty.uses_any()) }

    pub(crate) fn render(&self) -> String {
        let mut text = format!("message {} {{\n", self.name);
        for field in &self.fields {
            text.push_str(&format!(
                "  {} {} = {};\n",
                field.ty.render(&self.package),
                field.name,
                field.number
            ));
        }
        text.push_str("}\n");
        text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn widget() -> MessageRef {
        MessageRef {
            id:      QualifiedName::new("example.org/dep", "example.org/dep", "Widget"),
            package: "dep".to_string(),
            name:    "Widget".to_string(),
        }
    }

    #[test]
    fn test_bucket_for_every_kind() {
        let expected = |kind: ScalarKind| match kind {
            ScalarKind::Bool => ScalarSchema::Bool,
            ScalarKind::String => ScalarSchema::String,
            ScalarKind::Float32 => ScalarSchema::Float,
            ScalarKind::Float64 => ScalarSchema::Double,
            ScalarKind::Int64 => ScalarSchema::Int64,
            ScalarKind::Uint64 => ScalarSchema::Uint64,
            ScalarKind::Int | ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 => {
                ScalarSchema::Int32
            }
            _ => ScalarSchema::Uint32,
        };
        for kind in ScalarKind::iter() {
            assert_eq!(ScalarSchema::for_kind(kind), expected(kind), "{kind}");
        }
    }

    #[test]
    fn test_render_types() {
        assert_eq!(ScalarSchema::Any.to_string(), ANY_TYPE);
        assert_eq!(ScalarSchema::Uint64.to_string(), "uint64");
        let map = SchemaType::Map {
            key:   ScalarSchema::String,
            value: Box::new(SchemaType::Message(widget())),
        };
        assert_eq!(map.render("account"), "map<string, dep.Widget>");
        assert_eq!(map.render("dep"), "map<string, Widget>");
        assert_eq!(
            SchemaType::Repeated(Box::new(SchemaType::Scalar(ScalarSchema::Bytes))).render("x"),
            "repeated bytes"
        );
    }

    #[test]
    fn test_message_render_and_dependencies() {
        let message = Message::new(
            QualifiedName::new("example.org/app", "example.org/app/account", "Account"),
            "account".to_string(),
            "Account".to_string(),
            vec![
                MessageField {
                    name:   "Name".to_string(),
                    ty:     SchemaType::Scalar(ScalarSchema::String),
                    number: 1,
                },
                MessageField {
                    name:   "Widgets".to_string(),
                    ty:     SchemaType::Repeated(Box::new(SchemaType::Message(widget()))),
                    number: 2,
                },
                MessageField {
                    name:   "Primary".to_string(),
                    ty:     SchemaType::Message(widget()),
                    number: 3,
                },
            ],
        );
        assert_eq!(message.dependencies, vec![widget()]);
        assert_eq!(
            message.render(),
            "message Account {\n  string Name = 1;\n  repeated dep.Widget Widgets = 2;\n  dep.Widget Primary = 3;\n}\n"
        );
    }
}
