//! # protobridge
//!
//! Generates a proto3 schema and gRPC bridging code for an existing Go service.
//!
//! The service's method set is read from source (or from a JSON descriptor), every parameter and
//! result type is resolved to a schema message, and the schema files are written together with a
//! gRPC server adapter and client wrapper that convert between the native Go types and the
//! `protoc-gen-go` bindings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use error_stack::Report;

use crate::config::{GenerationConfig, GoEnvironment};
use crate::error::{Error, Result};
use crate::pipeline::{Generator, ServiceSource, compile, service_dir, stale_files, write_output};

mod bridge;
mod config;
mod context;
mod descriptor;
mod emitter;
mod error;
mod go_syntax;
mod locator;
mod pipeline;
mod resolver;
mod schema;
mod signature;
mod source;
mod support;

#[derive(Parser, Debug)]
#[command(name = "protobridge", version)]
#[command(about = "Generate proto3 schemas and gRPC bridging code from Go services", long_about = None)]
struct Cli {
    /// Tracing filter directive, for example `debug` or `protobridge=trace`
    #[arg(long, global = true, default_value = support::DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file:  Option<PathBuf>,
    #[command(subcommand)]
    command:   Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the schema files and stubs, then run the schema compiler
    Generate(GenerateArgs),
    /// Print the resolved methods and messages as JSON
    Inspect(ServiceArgs),
}

/// Where the service comes from and how its dependencies are found
#[derive(Args, Debug)]
struct ServiceArgs {
    /// Directory of the Go package declaring the service type
    #[arg(long, required_unless_present = "descriptor")]
    package_dir:     Option<PathBuf>,
    /// Name of the service type
    #[arg(long, required_unless_present = "descriptor", requires = "package_dir")]
    service:         Option<String>,
    /// JSON service descriptor to use instead of discovery
    #[arg(long, conflicts_with_all = ["package_dir", "service"])]
    descriptor:      Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    config:          Option<PathBuf>,
    /// Output directory; the service's files go to `<out>/<schema package>`
    #[arg(long)]
    out:             Option<PathBuf>,
    /// Import path prefix for `option go_package`
    #[arg(long)]
    go_package_base: Option<String>,
    /// Go module cache directory
    #[arg(long)]
    module_cache:    Option<PathBuf>,
    /// Go installation root, for standard-library types
    #[arg(long)]
    goroot:          Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    service:    ServiceArgs,
    /// Schema compiler program
    #[arg(long)]
    protoc:     Option<String>,
    /// Skip the schema compiler
    #[arg(long, default_value_t = false)]
    no_compile: bool,
    /// Do not write `server/server.go`
    #[arg(long, default_value_t = false)]
    no_server:  bool,
    /// Do not write `client/client.go`
    #[arg(long, default_value_t = false)]
    no_client:  bool,
    /// Write nothing; fail if any file on disk differs from the generated output
    #[arg(long, default_value_t = false)]
    check:      bool,
}

impl ServiceArgs {
    fn source(&self) -> Result<ServiceSource> {
        match (&self.descriptor, &self.package_dir, &self.service) {
            (Some(descriptor), _, _) => Ok(ServiceSource::Descriptor(descriptor.clone())),
            (None, Some(package_dir), Some(service)) => Ok(ServiceSource::Discover {
                package_dir: package_dir.clone(),
                service:     service.clone(),
            }),
            _ => Err(Report::new(Error::invalid(
                "arguments",
                "either --descriptor or both --package-dir and --service are required",
            ))),
        }
    }

    /// Environment defaults, then the config file, then flags
    fn config(&self) -> Result<GenerationConfig> {
        let mut environment = GoEnvironment::capture();
        if let Some(module_cache) = &self.module_cache {
            environment.gomodcache = Some(module_cache.display().to_string());
        }
        if let Some(goroot) = &self.goroot {
            environment.goroot = Some(goroot.display().to_string());
        }

        let mut config = match &self.config {
            Some(path) => GenerationConfig::load(path, &environment)?,
            None => GenerationConfig::from_environment(&environment)?,
        };
        if let Some(module_cache) = &self.module_cache {
            config.module_cache.clone_from(module_cache);
        }
        if let Some(goroot) = &self.goroot {
            config.goroot = Some(goroot.clone());
        }
        if let Some(out) = &self.out {
            config.output_dir.clone_from(out);
        }
        if let Some(base) = &self.go_package_base {
            config.go_package_base = Some(base.clone());
        }
        Ok(config)
    }
}

impl GenerateArgs {
    fn config(&self) -> Result<GenerationConfig> {
        let mut config = self.service.config()?;
        if let Some(protoc) = &self.protoc {
            config.compiler.program.clone_from(protoc);
        }
        if self.no_compile {
            config.compiler.enabled = false;
        }
        if self.no_server {
            config.emit_server = false;
        }
        if self.no_client {
            config.emit_client = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = match support::init_tracing(&cli.log_level, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(report) => {
            eprintln!("{report:?}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Generate(args) => generate(&args),
        Command::Inspect(args) => inspect(&args),
    };
    match outcome {
        Ok(code) => code,
        Err(report) => {
            tracing::error!("{}", report.current_context());
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn generate(args: &GenerateArgs) -> Result<ExitCode> {
    let source = args.service.source()?;
    let mut generator = Generator::new(args.config()?);
    let output = generator.generate(&source)?;
    let config = generator.config();
    let dir = service_dir(config, &output);

    if args.check {
        let stale = stale_files(&dir, &output);
        if stale.is_empty() {
            tracing::info!("{} is up to date", dir.display());
            return Ok(ExitCode::SUCCESS);
        }
        for path in &stale {
            println!("out of date: {}", path.display());
        }
        return Ok(ExitCode::FAILURE);
    }

    write_output(&dir, &output)?;
    if config.compiler.enabled {
        compile(config, &dir, &output)?;
    }
    tracing::info!(
        "Generated {} methods of {} into {} (go_package base {})",
        output.methods.len(),
        output.service.name,
        dir.display(),
        output.go_package_base
    );
    Ok(ExitCode::SUCCESS)
}

fn inspect(args: &ServiceArgs) -> Result<ExitCode> {
    let source = args.source()?;
    let config = args.config()?;
    config.validate()?;
    let json = Generator::new(config).inspect(&source)?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}
