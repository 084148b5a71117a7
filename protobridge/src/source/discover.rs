//! Service discovery: the method set of a service type, read from its package's source

use std::path::Path;

use error_stack::{Report, ResultExt};
use itertools::Itertools;

use super::lowering::Lowerer;
use crate::context::GenerationContext;
use crate::descriptor::{MethodDescriptor, ServiceDescriptor, ServicePackage, Visibility};
use crate::error::{Error, Result};
use crate::go_syntax::ast::FieldList;

/// Exported methods declared on `service` or `*service` in the package at `package_dir`,
/// sorted by name
pub(crate) fn discover_service(
    ctx: &mut GenerationContext,
    package_dir: &Path,
    service: &str,
) -> Result<ServiceDescriptor> {
    let package = ctx.sources().load_dir(package_dir)?;
    ctx.sources().set_origin(&package.dir);

    if package.type_spec(service).is_none() {
        return Err(Report::new(Error::TypeNotFound(format!(
            "service {service} in package {}",
            package.import_path
        ))));
    }

    let declarations = package
        .files
        .iter()
        .flat_map(|file| file.funcs.iter().map(move |func| (file, func)))
        .filter(|(_, func)| {
            func.receiver
                .as_ref()
                .is_some_and(|receiver| receiver.type_name == service)
                && Visibility::of(&func.name) == Visibility::Exported
        })
        .sorted_by(|(_, a), (_, b)| a.name.cmp(&b.name))
        .collect::<Vec<_>>();

    let mut lowerer = Lowerer::new(ctx.sources());
    let mut methods = Vec::with_capacity(declarations.len());
    for (file, func) in declarations {
        let mut lower_all = |role: &str, list: &FieldList| {
            list.entries()
                .enumerate()
                .map(|(index, (_, ty))| {
                    lowerer.lower(&package, file, ty).attach(format!(
                        "{role} {index} of {service}.{} at {}:{}",
                        func.name,
                        file.path.display(),
                        func.line
                    ))
                })
                .collect::<Result<Vec<_>>>()
        };
        let params = lower_all("parameter", &func.params)?;
        let results = lower_all("result", &func.results)?;

        tracing::debug!(
            "Discovered {service}.{} with {} params and {} results",
            func.name,
            params.len(),
            results.len()
        );
        methods.push(MethodDescriptor {
            name: func.name.clone(),
            file: file.path.clone(),
            line: func.line,
            params,
            results,
            variadic: func.params.is_variadic(),
        });
    }

    Ok(ServiceDescriptor {
        name: service.to_string(),
        package: ServicePackage {
            module:      package.module.path.clone(),
            import_path: package.import_path.clone(),
            name:        package.name.clone(),
            dir:         package.dir.clone(),
        },
        methods,
    })
}
