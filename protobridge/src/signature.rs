//! Signature extraction
//!
//! Method descriptors carry types but no names. The names come from the declaration found at the
//! descriptor's file and line, aligned position by position with the descriptor's types.

use error_stack::{Report, ResultExt};

use crate::context::GenerationContext;
use crate::descriptor::{MethodDescriptor, MethodSignature, Parameter, ServiceDescriptor};
use crate::error::{Error, Result};
use crate::go_syntax::ast::FieldList;

/// Name given to every error-typed result
const ERROR_RESULT_NAME: &str = "err";

/// Placeholder for an unnamed or blank entry at `index`
fn unnamed(index: usize) -> String { format!("unnamed{index}") }

/// Named signatures for every method of `service`, in descriptor order
pub(crate) fn extract_signatures(
    ctx: &mut GenerationContext,
    service: &ServiceDescriptor,
) -> Result<Vec<MethodSignature>> {
    service
        .methods
        .iter()
        .map(|method| {
            extract_signature(ctx, method)
                .attach(format!("while extracting {}.{}", service.name, method.name))
        })
        .collect()
}

pub(crate) fn extract_signature(
    ctx: &mut GenerationContext,
    method: &MethodDescriptor,
) -> Result<MethodSignature> {
    let location = format!("{}:{}", method.file.display(), method.line);
    let file = ctx
        .sources()
        .parse_file(&method.file)
        .change_context(Error::DeclarationNotFound(format!(
            "{} at {location}: source is unreadable",
            method.name
        )))?;

    let Some(func) = file.func_at_line(method.line) else {
        return Err(Report::new(Error::DeclarationNotFound(format!(
            "{} at {location}: no function declared on that line",
            method.name
        ))));
    };
    if func.name != method.name {
        return Err(Report::new(Error::DeclarationNotFound(format!(
            "{} at {location}: found {} instead",
            method.name, func.name
        ))));
    }

    if method.variadic && !func.params.is_variadic() {
        return Err(Report::new(Error::DeclarationNotFound(format!(
            "{} at {location}: declared without a variadic parameter",
            method.name
        ))));
    }
    check_arity(&method.name, "parameters", &func.params, method.params.len())?;
    check_arity(&method.name, "results", &func.results, method.results.len())?;

    let params = method
        .params
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            Ok(Parameter {
                name: declared_name(&func.params, index, &method.name, "parameters")?,
                ty:   ty.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut results: Vec<Parameter> = Vec::with_capacity(method.results.len());
    for (index, ty) in method.results.iter().enumerate() {
        let name = if ty.is_error() {
            if results.iter().any(|result| result.name == ERROR_RESULT_NAME) {
                format!("{ERROR_RESULT_NAME}{index}")
            } else {
                ERROR_RESULT_NAME.to_string()
            }
        } else {
            declared_name(&func.results, index, &method.name, "results")?
        };
        results.push(Parameter {
            name,
            ty: ty.clone(),
        });
    }

    tracing::trace!(
        "Recovered names for {}: ({}) -> ({})",
        method.name,
        params.iter().map(|param| param.name.as_str()).collect::<Vec<_>>().join(", "),
        results.iter().map(|result| result.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(MethodSignature::new(method.name.clone(), params, results)
        .with_variadic(func.params.is_variadic()))
}

fn check_arity(
    method: &str,
    role: &'static str,
    declared: &FieldList,
    expected: usize,
) -> Result<()> {
    if declared.len() == expected {
        Ok(())
    } else {
        Err(Report::new(Error::ArityMismatch {
            method: method.to_string(),
            role,
            declared: declared.len(),
            expected,
        }))
    }
}

fn declared_name(list: &FieldList, index: usize, method: &str, role: &str) -> Result<String> {
    match list.name_at(index) {
        Some(Some(name)) if name != "_" => Ok(name.to_string()),
        Some(_) => Ok(unnamed(index)),
        None => Err(Report::new(Error::NameIndexOutOfRange {
            index,
            context: format!("{role} of {method}"),
        })),
    }
}
