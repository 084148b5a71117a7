//! One generation run
//!
//! [`Generator`] drives the stages in order: describe the service, extract named signatures,
//! resolve request and response messages, render the schema files and render the stubs. Nothing
//! touches the output directory until every file has been rendered in memory.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use error_stack::{Report, ResultExt};
use itertools::Itertools;
use serde::Serialize;

use crate::bridge::{GoFile, StubTarget, generate_stubs};
use crate::config::GenerationConfig;
use crate::context::GenerationContext;
use crate::descriptor::ServiceDescriptor;
use crate::emitter::{SchemaFile, compile_schemas, emit_schemas};
use crate::error::{Error, Result};
use crate::resolver::{ResolvedMethod, resolve_method};
use crate::schema::Message;
use crate::signature::extract_signatures;
use crate::source::discover_service;

/// Base used when the output directory has no usable name
const FALLBACK_GO_PACKAGE_BASE: &str = "gen";

/// Where the service's method set comes from
#[derive(Debug, Clone)]
pub(crate) enum ServiceSource {
    /// Read the method set of a type from its package's source
    Discover { package_dir: PathBuf, service: String },
    /// Load a JSON descriptor produced elsewhere
    Descriptor(PathBuf),
}

/// Everything one run produced, before it is written
#[derive(Debug)]
pub(crate) struct GenerationOutput {
    pub service:         ServiceDescriptor,
    pub schema_package:  String,
    pub go_package_base: String,
    pub methods:         Vec<ResolvedMethod>,
    /// Dependency packages first, the service package last
    pub schemas:         Vec<SchemaFile>,
    pub stubs:           Vec<GoFile>,
}

impl GenerationOutput {
    /// Every file relative to the service directory, schemas first
    pub(crate) fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.schemas
            .iter()
            .map(|file| (file.path.as_path(), file.contents.as_str()))
            .chain(
                self.stubs
                    .iter()
                    .map(|file| (file.path.as_path(), file.contents.as_str())),
            )
    }
}

/// Resolved view of a service, as printed by `inspect`
#[derive(Debug, Serialize)]
pub(crate) struct Inspection<'a> {
    pub service:        &'a str,
    pub schema_package: &'a str,
    pub methods:        &'a [ResolvedMethod],
    pub messages:       Vec<&'a Message>,
}

pub(crate) struct Generator {
    ctx: GenerationContext,
}

impl Generator {
    pub(crate) fn new(config: GenerationConfig) -> Self {
        Self {
            ctx: GenerationContext::new(config),
        }
    }

    pub(crate) const fn config(&self) -> &GenerationConfig { self.ctx.config() }

    /// The service descriptor, discovered from source or loaded and validated
    pub(crate) fn describe(&mut self, source: &ServiceSource) -> Result<ServiceDescriptor> {
        match source {
            ServiceSource::Discover {
                package_dir,
                service,
            } => {
                tracing::info!("Discovering {service} in {}", package_dir.display());
                discover_service(&mut self.ctx, package_dir, service)
            }
            ServiceSource::Descriptor(path) => {
                tracing::info!("Loading service descriptor {}", path.display());
                let service = ServiceDescriptor::load(path)?;
                self.ctx.sources().set_origin(&service.package.dir);
                Ok(service)
            }
        }
    }

    /// Named signatures resolved to request and response messages, in method order
    pub(crate) fn resolve(&mut self, service: &ServiceDescriptor) -> Result<Vec<ResolvedMethod>> {
        tracing::info!("Resolving {} methods of {}", service.methods.len(), service.name);
        let signatures = extract_signatures(&mut self.ctx, service)?;
        signatures
            .iter()
            .map(|signature| {
                resolve_method(&mut self.ctx, &service.package, signature)
                    .attach(format!("service {}", service.name))
            })
            .collect()
    }

    pub(crate) fn generate(&mut self, source: &ServiceSource) -> Result<GenerationOutput> {
        let service = self.describe(source)?;
        let methods = self.resolve(&service)?;
        let go_package_base = match &self.config().go_package_base {
            Some(base) => base.clone(),
            None => self.default_go_package_base(&service)?,
        };
        let schema_package = self
            .ctx
            .schema_package(&service.package.import_path, &service.package.name);

        tracing::info!("Rendering schemas for package {schema_package}");
        let schemas = emit_schemas(&mut self.ctx, &service, &methods, &go_package_base)?;

        tracing::info!("Rendering stubs");
        let stubs = generate_stubs(
            &mut self.ctx,
            &StubTarget {
                service:         &service,
                methods:         &methods,
                schema_package:  &schema_package,
                go_package_base: &go_package_base,
            },
        )?;

        Ok(GenerationOutput {
            service,
            schema_package,
            go_package_base,
            methods,
            schemas,
            stubs,
        })
    }

    /// Describe and resolve without rendering anything
    pub(crate) fn inspect(&mut self, source: &ServiceSource) -> Result<String> {
        let service = self.describe(source)?;
        let methods = self.resolve(&service)?;
        let schema_package = self
            .ctx
            .schema_package(&service.package.import_path, &service.package.name);
        let inspection = Inspection {
            service:        &service.name,
            schema_package: &schema_package,
            methods:        &methods,
            messages:       self.ctx.cache().messages().map(AsRef::as_ref).collect(),
        };
        serde_json::to_string_pretty(&inspection)
            .map_err(|error| Report::new(Error::failed_to("serialize inspection", error)))
    }

    /// `<main module>/<output dir relative to the module root>`, or the output directory's name
    /// when it lies outside the main module
    fn default_go_package_base(&mut self, service: &ServiceDescriptor) -> Result<String> {
        let output_dir = std::path::absolute(&self.config().output_dir).map_err(|error| {
            Report::new(Error::io_failed("resolve", &self.config().output_dir, error))
        })?;
        let manifest = self
            .ctx
            .sources()
            .locator()
            .find_manifest(&service.package.dir)?;

        let base = if let Ok(relative) = output_dir.strip_prefix(&manifest.dir) {
            std::iter::once(manifest.module.as_str())
                .chain(relative.components().filter_map(|component| match component {
                    Component::Normal(segment) => segment.to_str(),
                    _ => None,
                }))
                .join("/")
        } else {
            output_dir
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or(FALLBACK_GO_PACKAGE_BASE)
                .to_string()
        };
        tracing::debug!("Derived go_package base {base}");
        Ok(base)
    }
}

/// `<out>/<svc>`
pub(crate) fn service_dir(config: &GenerationConfig, output: &GenerationOutput) -> PathBuf {
    config.output_dir.join(&output.schema_package)
}

/// Write every generated file under `dir`
pub(crate) fn write_output(dir: &Path, output: &GenerationOutput) -> Result<()> {
    for (relative, contents) in output.files() {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                Report::new(Error::io_failed("create directory", parent, error))
            })?;
        }
        std::fs::write(&path, contents)
            .map_err(|error| Report::new(Error::io_failed("write", &path, error)))?;
        tracing::debug!("Wrote {}", path.display());
    }
    Ok(())
}

/// Files under `dir` that are missing or differ from what would be written
pub(crate) fn stale_files(dir: &Path, output: &GenerationOutput) -> Vec<PathBuf> {
    output
        .files()
        .map(|(relative, contents)| (dir.join(relative), contents))
        .filter(|(path, contents)| {
            !std::fs::read_to_string(path).is_ok_and(|existing| existing == *contents)
        })
        .map(|(path, _)| path)
        .collect()
}

/// Run the schema compiler over the written schema files, dependencies first
pub(crate) fn compile(
    config: &GenerationConfig,
    dir: &Path,
    output: &GenerationOutput,
) -> Result<()> {
    tracing::info!(
        "Compiling {} schema files with {}",
        output.schemas.len(),
        config.compiler.program
    );
    compile_schemas(
        &config.compiler,
        dir,
        output.schemas.iter().map(|file| file.path.as_path()),
    )
}
