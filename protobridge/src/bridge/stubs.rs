//! Server and client stubs
//!
//! `server/server.go` adapts the native service to the generated gRPC server interface and
//! `client/client.go` exposes the RPCs with the native method signatures. Each file carries the
//! conversion helpers its handlers need.

use std::path::PathBuf;

use super::convert::Converter;
use super::naming::{argument, go_camel_case, result};
use super::writer::GoWriter;
use crate::context::GenerationContext;
use crate::descriptor::{ServiceDescriptor, TypeDescriptor};
use crate::error::Result;
use crate::resolver::ResolvedMethod;

const GENERATED_HEADER: &str = "// Code generated by protobridge. DO NOT EDIT.";
const CODES_PATH: &str = "google.golang.org/grpc/codes";
const GRPC_PATH: &str = "google.golang.org/grpc";
const STATUS_PATH: &str = "google.golang.org/grpc/status";

/// A generated Go file, located relative to the service's output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GoFile {
    pub path:     PathBuf,
    pub contents: String,
}

/// What every stub needs to know about the service being bridged
pub(crate) struct StubTarget<'a> {
    pub service:         &'a ServiceDescriptor,
    pub methods:         &'a [ResolvedMethod],
    pub schema_package:  &'a str,
    pub go_package_base: &'a str,
}

impl StubTarget<'_> {
    fn full_method(&self, method: &str) -> String {
        format!("/{}.{}/{method}", self.schema_package, self.service.name)
    }
}

pub(crate) fn write_server(ctx: &mut GenerationContext, target: &StubTarget<'_>) -> Result<GoFile> {
    let service = go_camel_case(&target.service.name);
    let mut converter = Converter::new(ctx, target.schema_package, target.go_package_base);
    let native = converter.native_package(
        &target.service.package.import_path,
        &target.service.package.name,
    );
    let binding = converter.binding_package(target.schema_package);
    converter.imports().standard("context");

    let mut out = GoWriter::new();
    if !target.methods.is_empty() {
        let constants: Vec<(String, String)> = target
            .methods
            .iter()
            .map(|method| {
                (
                    format!("{service}{}FullMethod", go_camel_case(&method.signature.name)),
                    target.full_method(&method.signature.name),
                )
            })
            .collect();
        let width = constants.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        out.open("const (");
        for (name, value) in constants {
            out.line(format!("{name:<width$} = \"{value}\""));
        }
        out.close(")");
        out.blank();
    }

    out.line(format!("// {service}Server serves {native}.{} over gRPC.", target.service.name));
    out.open(format!("type {service}Server struct {{"));
    out.line(format!("{binding}.Unimplemented{service}Server"));
    out.line(format!("service *{native}.{}", target.service.name));
    out.close("}");
    out.blank();
    out.line(format!("// New{service}Server wraps service for registration with a gRPC server."));
    out.open(format!(
        "func New{service}Server(service *{native}.{}) *{service}Server {{",
        target.service.name
    ));
    out.line(format!("return &{service}Server{{service: service}}"));
    out.close("}");

    for method in target.methods {
        out.blank();
        write_handler(&mut converter, &mut out, &service, &binding, method)?;
    }
    converter.write_helpers(&mut out)?;

    tracing::debug!("Rendered server stub with {} handlers", target.methods.len());
    Ok(GoFile {
        path:     PathBuf::from("server").join("server.go"),
        contents: render_file("server", &converter.into_imports().render(), &out.finish()),
    })
}

fn write_handler(
    converter: &mut Converter<'_>,
    out: &mut GoWriter,
    service: &str,
    binding: &str,
    method: &ResolvedMethod,
) -> Result<()> {
    let signature = &method.signature;
    let name = go_camel_case(&signature.name);
    out.line(format!("// {name} handles {service}{name}FullMethod."));
    out.open(format!(
        "func (s *{service}Server) {name}(ctx context.Context, request *{binding}.{}) (*{binding}.{}, error) {{",
        go_camel_case(method.request_name()),
        go_camel_case(method.response_name())
    ));

    let mut args = Vec::with_capacity(signature.params.len());
    for (index, param) in signature.params.iter().enumerate() {
        if index == 0 && signature.accepts_context {
            args.push("ctx".to_string());
        } else if param.ty.is_elided() {
            args.push(converter.zero_value(&param.ty));
        } else {
            let local = argument(index);
            let source = format!("request.Get{}()", go_camel_case(&param.name));
            converter.decode(out, &local, true, &source, &param.ty)?;
            args.push(local);
        }
    }

    if signature.variadic
        && let Some(last) = args.last_mut()
    {
        last.push_str("...");
    }

    let error_index = signature
        .last_result_is_error
        .then(|| signature.results.len() - 1);
    let names: Vec<String> = signature
        .results
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            if Some(index) == error_index {
                "err".to_string()
            } else if entry.ty.is_elided() {
                "_".to_string()
            } else {
                result(index)
            }
        })
        .collect();
    let call = format!("s.service.{}({})", signature.name, args.join(", "));
    if names.is_empty() {
        out.line(call);
    } else if names.iter().all(|name| name == "_") {
        out.line(format!("{} = {call}", names.join(", ")));
    } else {
        out.line(format!("{} := {call}", names.join(", ")));
    }

    if error_index.is_some() {
        converter.imports().aliased(STATUS_PATH, "status");
        converter.imports().aliased(CODES_PATH, "codes");
        out.open("if err != nil {");
        out.line("return nil, status.Error(codes.Internal, err.Error())");
        out.close("}");
    }

    out.line(format!(
        "response := &{binding}.{}{{}}",
        go_camel_case(method.response_name())
    ));
    for (index, entry) in signature.response_results().iter().enumerate() {
        if entry.ty.is_elided() {
            continue;
        }
        let target = format!("response.{}", go_camel_case(&entry.name));
        converter.encode(out, &target, false, &result(index), &entry.ty)?;
    }
    out.line("return response, nil");
    out.close("}");
    Ok(())
}

pub(crate) fn write_client(ctx: &mut GenerationContext, target: &StubTarget<'_>) -> Result<GoFile> {
    let service = go_camel_case(&target.service.name);
    let mut converter = Converter::new(ctx, target.schema_package, target.go_package_base);
    let native = converter.native_package(
        &target.service.package.import_path,
        &target.service.package.name,
    );
    let binding = converter.binding_package(target.schema_package);
    converter.imports().aliased(GRPC_PATH, "grpc");

    let mut out = GoWriter::new();
    out.line(format!(
        "// {service}Client calls {native}.{} through a gRPC connection.",
        target.service.name
    ));
    out.open(format!("type {service}Client struct {{"));
    out.line(format!("client {binding}.{service}Client"));
    out.close("}");
    out.blank();
    out.line(format!("// New{service}Client wraps conn."));
    out.open(format!(
        "func New{service}Client(conn grpc.ClientConnInterface) *{service}Client {{"
    ));
    out.line(format!(
        "return &{service}Client{{client: {binding}.New{service}Client(conn)}}"
    ));
    out.close("}");

    for method in target.methods {
        out.blank();
        write_call(&mut converter, &mut out, &service, &binding, method)?;
    }
    converter.write_helpers(&mut out)?;

    tracing::debug!("Rendered client stub with {} calls", target.methods.len());
    Ok(GoFile {
        path:     PathBuf::from("client").join("client.go"),
        contents: render_file("client", &converter.into_imports().render(), &out.finish()),
    })
}

fn write_call(
    converter: &mut Converter<'_>,
    out: &mut GoWriter,
    service: &str,
    binding: &str,
    method: &ResolvedMethod,
) -> Result<()> {
    let signature = &method.signature;
    let name = go_camel_case(&signature.name);
    converter.imports().standard("context");

    let mut params = Vec::with_capacity(signature.params.len());
    let last = signature.params.len().saturating_sub(1);
    for (index, param) in signature.params.iter().enumerate() {
        if index == 0 && signature.accepts_context {
            params.push("ctx context.Context".to_string());
        } else if signature.variadic
            && index == last
            && let TypeDescriptor::Slice(element) = &param.ty
        {
            params.push(format!("{} ...{}", argument(index), converter.native_type(element)));
        } else {
            params.push(format!("{} {}", argument(index), converter.native_type(&param.ty)));
        }
    }
    let results: Vec<String> = signature
        .results
        .iter()
        .map(|entry| converter.native_type(&entry.ty))
        .collect();
    let returns = match results.len() {
        0 => String::new(),
        1 => format!(" {}", results[0]),
        _ => format!(" ({})", results.join(", ")),
    };

    out.line(format!("// {name} calls {service}.{name} remotely."));
    out.open(format!(
        "func (c *{service}Client) {name}({}){returns} {{",
        params.join(", ")
    ));
    out.line(format!(
        "request := &{binding}.{}{{}}",
        go_camel_case(method.request_name())
    ));
    let offset = usize::from(signature.accepts_context);
    for (index, param) in signature.request_params().iter().enumerate() {
        if param.ty.is_elided() {
            continue;
        }
        let target = format!("request.{}", go_camel_case(&param.name));
        converter.encode(out, &target, false, &argument(index + offset), &param.ty)?;
    }

    let context = if signature.accepts_context {
        "ctx"
    } else {
        "context.Background()"
    };
    let response = if method.response.fields.is_empty() {
        "_"
    } else {
        "response"
    };
    out.line(format!(
        "{response}, err := c.client.{name}({context}, request)"
    ));

    let outputs = signature.response_results();
    let mut failure = Vec::with_capacity(signature.results.len());
    let mut success = Vec::with_capacity(signature.results.len());
    for (index, entry) in outputs.iter().enumerate() {
        let zero = converter.zero_value(&entry.ty);
        failure.push(zero.clone());
        success.push(if entry.ty.is_elided() { zero } else { result(index) });
    }
    out.open("if err != nil {");
    if let Some(error) = signature.results.last().filter(|_| signature.last_result_is_error) {
        failure.push(converter.rpc_error(out, &error.ty));
        success.push("nil".to_string());
    }
    out.line(return_statement(&failure));
    out.close("}");
    for (index, entry) in outputs.iter().enumerate() {
        if entry.ty.is_elided() {
            continue;
        }
        let source = format!("response.Get{}()", go_camel_case(&entry.name));
        converter.decode(out, &result(index), true, &source, &entry.ty)?;
    }
    if !success.is_empty() {
        out.line(return_statement(&success));
    }
    out.close("}");
    Ok(())
}

fn return_statement(values: &[String]) -> String {
    if values.is_empty() {
        "return".to_string()
    } else {
        format!("return {}", values.join(", "))
    }
}

fn render_file(package: &str, imports: &str, body: &str) -> String {
    let mut text = format!("{GENERATED_HEADER}\n\npackage {package}\n\n");
    if !imports.is_empty() {
        text.push_str(imports);
        text.push('\n');
    }
    text.push_str(body);
    text
}
