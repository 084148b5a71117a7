//! Schema emission
//!
//! Renders one proto3 file per schema package: the service package's file carries its own struct
//! messages, the request/response pairs and the `service` block, and every other package that
//! contributed a struct gets `<pkg>/<pkg>.proto` beneath it. Messages appear dependencies first.

mod compiler;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;

use error_stack::Report;

pub(crate) use compiler::compile_schemas;

use crate::context::GenerationContext;
use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};
use crate::resolver::ResolvedMethod;
use crate::schema::{ANY_IMPORT, Message, MessageRef};

const SCHEMA_SYNTAX: &str = "proto3";
const SCHEMA_EXTENSION: &str = "proto";

/// A rendered schema file, located relative to the service's schema root
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SchemaFile {
    pub package:  String,
    pub path:     PathBuf,
    pub contents: String,
}

/// Import path of `package`'s file as seen from the schema root
pub(crate) fn schema_import_path(package: &str, service_package: &str) -> String {
    if package == service_package {
        format!("{package}.{SCHEMA_EXTENSION}")
    } else {
        format!("{package}/{package}.{SCHEMA_EXTENSION}")
    }
}

/// `option go_package` value for `package`
pub(crate) fn go_package(go_package_base: &str, package: &str, service_package: &str) -> String {
    if package == service_package {
        format!("{go_package_base}/{service_package}")
    } else {
        format!("{go_package_base}/{service_package}/{package}")
    }
}

/// Messages destined for one schema file, in emission order
struct PackageMessages {
    package:  String,
    messages: Vec<Rc<Message>>,
}

/// Render every schema file for `service`; dependency packages come before the service file
pub(crate) fn emit_schemas(
    ctx: &mut GenerationContext,
    service: &ServiceDescriptor,
    methods: &[ResolvedMethod],
    go_package_base: &str,
) -> Result<Vec<SchemaFile>> {
    let service_package =
        ctx.schema_package(&service.package.import_path, &service.package.name);
    let mut packages = vec![PackageMessages {
        package:  service_package.clone(),
        messages: Vec::new(),
    }];

    for method in methods {
        for dependency in method
            .request
            .dependencies
            .iter()
            .chain(&method.response.dependencies)
        {
            visit(ctx, dependency, &mut packages)?;
        }
    }

    let mut files = Vec::with_capacity(packages.len());
    let mut packages = packages.into_iter();
    let service_messages = packages.next().map(|package| package.messages).unwrap_or_default();

    for package in packages {
        let contents = render_file(
            &package.package,
            &go_package(go_package_base, &package.package, &service_package),
            &service_package,
            package.messages.iter().map(AsRef::as_ref),
            None,
        );
        files.push(SchemaFile {
            path: PathBuf::from(schema_import_path(&package.package, &service_package)),
            package: package.package,
            contents,
        });
    }

    let service_block = render_service(&service.name, methods);
    let contents = render_file(
        &service_package,
        &go_package(go_package_base, &service_package, &service_package),
        &service_package,
        service_messages
            .iter()
            .map(AsRef::as_ref)
            .chain(methods.iter().flat_map(|method| [&method.request, &method.response])),
        Some(&service_block),
    );
    files.push(SchemaFile {
        path: PathBuf::from(schema_import_path(&service_package, &service_package)),
        package: service_package,
        contents,
    });

    for file in &files {
        tracing::debug!("Rendered schema {} ({} bytes)", file.path.display(), file.contents.len());
    }
    Ok(files)
}

/// Depth-first, dependencies before dependents, each message once
fn visit(
    ctx: &mut GenerationContext,
    reference: &MessageRef,
    packages: &mut Vec<PackageMessages>,
) -> Result<()> {
    let Some(message) = ctx.cache().get(&reference.id).map(Rc::clone) else {
        return Err(Report::new(Error::TypeNotFound(format!(
            "message {} for {} was never resolved",
            reference.name, reference.id
        ))));
    };
    if !ctx.cache_mut().mark_emitted(&reference.id) {
        return Ok(());
    }

    for dependency in &message.dependencies {
        visit(ctx, dependency, packages)?;
    }

    if let Some(package) = packages
        .iter_mut()
        .find(|package| package.package == message.package)
    {
        package.messages.push(message);
    } else {
        packages.push(PackageMessages {
            package:  message.package.clone(),
            messages: vec![message],
        });
    }
    Ok(())
}

fn render_service(name: &str, methods: &[ResolvedMethod]) -> String {
    let mut text = format!("service {name} {{\n");
    for method in methods {
        text.push_str(&format!(
            "  rpc {} ({}) returns ({});\n",
            method.signature.name,
            method.request_name(),
            method.response_name()
        ));
    }
    text.push_str("}\n");
    text
}

fn render_file<'a>(
    package: &str,
    go_package: &str,
    service_package: &str,
    messages: impl Iterator<Item = &'a Message> + Clone,
    service_block: Option<&str>,
) -> String {
    let mut imports = BTreeSet::new();
    for message in messages.clone() {
        for dependency in &message.dependencies {
            if dependency.package != package {
                imports.insert(schema_import_path(&dependency.package, service_package));
            }
        }
        if message.uses_any() {
            imports.insert(ANY_IMPORT.to_string());
        }
    }

    let mut sections = vec![format!(
        "syntax = \"{SCHEMA_SYNTAX}\";\n\npackage {package};\n\noption go_package = \"{go_package}\";\n"
    )];
    if !imports.is_empty() {
        sections.push(
            imports
                .iter()
                .map(|import| format!("import \"{import}\";\n"))
                .collect(),
        );
    }
    sections.extend(messages.map(Message::render));
    if let Some(block) = service_block {
        sections.push(block.to_string());
    }
    sections.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::GenerationConfig;
    use crate::descriptor::{
        FieldDescriptor, MethodSignature, Parameter, QualifiedName, ScalarKind, ServicePackage,
        StructDef, StructRef, TypeDescriptor, Visibility,
    };
    use crate::resolver::resolve_method;

    fn field(name: &str, ty: TypeDescriptor) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            ty,
            visibility: Visibility::Exported,
            embedded: false,
        }
    }

    fn param(name: &str, ty: TypeDescriptor) -> Parameter {
        Parameter {
            name: name.to_string(),
            ty,
        }
    }

    fn service() -> ServiceDescriptor {
        ServiceDescriptor {
            name:    "Account".to_string(),
            package: ServicePackage {
                module:      "example.org/app".to_string(),
                import_path: "example.org/app/account".to_string(),
                name:        "account".to_string(),
                dir:         PathBuf::from("/nonexistent"),
            },
            methods: Vec::new(),
        }
    }

    fn emit() -> Vec<SchemaFile> {
        let mut ctx = GenerationContext::new(GenerationConfig {
            module_cache: PathBuf::from("/nonexistent/cache"),
            ..GenerationConfig::default()
        });
        let part = StructRef {
            id:           QualifiedName::new("example.org/dep", "example.org/dep", "Part"),
            package_name: "dep".to_string(),
        };
        let widget = StructRef {
            id:           QualifiedName::new("example.org/dep", "example.org/dep", "Widget"),
            package_name: "dep".to_string(),
        };
        let user = StructRef {
            id:           QualifiedName::new("example.org/app", "example.org/app/account", "User"),
            package_name: "account".to_string(),
        };
        ctx.register_struct(StructDef {
            id:     part.id.clone(),
            fields: vec![field("Serial", TypeDescriptor::scalar(ScalarKind::Uint64))],
        });
        ctx.register_struct(StructDef {
            id:     widget.id.clone(),
            fields: vec![
                field("Name", TypeDescriptor::scalar(ScalarKind::String)),
                field("Parts", TypeDescriptor::slice(TypeDescriptor::Struct(part))),
                field("Callback", TypeDescriptor::Function),
            ],
        });
        ctx.register_struct(StructDef {
            id:     user.id.clone(),
            fields: vec![
                field("Name", TypeDescriptor::scalar(ScalarKind::String)),
                field("Extra", TypeDescriptor::Interface(crate::descriptor::InterfaceRef {
                    name:             None,
                    implements_error: false,
                })),
            ],
        });

        let service = service();
        let methods = [
            MethodSignature::new(
                "Login".to_string(),
                vec![
                    param("ctx", TypeDescriptor::context()),
                    param("user", TypeDescriptor::pointer(TypeDescriptor::Struct(user))),
                ],
                vec![
                    param("token", TypeDescriptor::scalar(ScalarKind::String)),
                    param("err", TypeDescriptor::error()),
                ],
            ),
            MethodSignature::new(
                "Widget".to_string(),
                vec![param("name", TypeDescriptor::scalar(ScalarKind::String))],
                vec![param("widget", TypeDescriptor::Struct(widget))],
            ),
        ]
        .iter()
        .map(|signature| resolve_method(&mut ctx, &service.package, signature).unwrap())
        .collect::<Vec<_>>();

        emit_schemas(&mut ctx, &service, &methods, "example.org/app/gen").unwrap()
    }

    #[test]
    fn test_file_layout() {
        let files = emit();
        let paths: Vec<&Path> = files.iter().map(|file| file.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("dep/dep.proto"), Path::new("account.proto")]);
    }

    #[test]
    fn test_dependency_file() {
        let files = emit();
        assert_eq!(
            files[0].contents,
            "syntax = \"proto3\";\n\npackage dep;\n\noption go_package = \"example.org/app/gen/account/dep\";\n\n\
             message Part {\n  uint64 Serial = 1;\n}\n\n\
             message Widget {\n  string Name = 1;\n  repeated Part Parts = 2;\n}\n"
        );
    }

    #[test]
    fn test_service_file() {
        let files = emit();
        assert_eq!(
            files[1].contents,
            "syntax = \"proto3\";\n\npackage account;\n\noption go_package = \"example.org/app/gen/account\";\n\n\
             import \"dep/dep.proto\";\nimport \"google/protobuf/any.proto\";\n\n\
             message User {\n  string Name = 1;\n  google.protobuf.Any Extra = 2;\n}\n\n\
             message LoginRequest {\n  User user = 1;\n}\n\n\
             message LoginResponse {\n  string token = 1;\n}\n\n\
             message WidgetRequest {\n  string name = 1;\n}\n\n\
             message WidgetResponse {\n  dep.Widget widget = 1;\n}\n\n\
             service Account {\n  rpc Login (LoginRequest) returns (LoginResponse);\n  rpc Widget (WidgetRequest) returns (WidgetResponse);\n}\n"
        );
    }

    #[test]
    fn test_emission_is_reproducible() {
        assert_eq!(emit(), emit());
    }

    #[test]
    fn test_paths_and_go_packages() {
        assert_eq!(schema_import_path("account", "account"), "account.proto");
        assert_eq!(schema_import_path("dep", "account"), "dep/dep.proto");
        assert_eq!(go_package("m/gen", "dep", "account"), "m/gen/account/dep");
        assert_eq!(go_package("m/gen", "account", "account"), "m/gen/account");
    }
}
