//! External schema compiler invocation

use std::path::Path;
use std::process::{Command, Stdio};

use error_stack::{Report, ResultExt};

use crate::config::CompilerConfig;
use crate::error::{Error, Result};

/// Flags requesting Go message and gRPC bindings next to each schema file
const BINDING_FLAGS: [&str; 4] = [
    "--go_out=.",
    "--go_opt=paths=source_relative",
    "--go-grpc_out=.",
    "--go-grpc_opt=paths=source_relative",
];

/// Build the compiler command for one schema file, relative to `proto_root`
pub(crate) fn build_compiler_command(
    config: &CompilerConfig,
    proto_root: &Path,
    schema_file: &Path,
) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.current_dir(proto_root);
    cmd.args(BINDING_FLAGS);
    cmd.args(&config.extra_args);
    cmd.arg(schema_file);
    cmd
}

/// Compile each schema file in order, stopping at the first failure
pub(crate) fn compile_schemas<'a>(
    config: &CompilerConfig,
    proto_root: &Path,
    schema_files: impl IntoIterator<Item = &'a Path>,
) -> Result<()> {
    for schema_file in schema_files {
        let mut cmd = build_compiler_command(config, proto_root, schema_file);
        execute_compiler_command(&mut cmd, &config.program, schema_file)?;
    }
    Ok(())
}

fn execute_compiler_command(cmd: &mut Command, program: &str, schema_file: &Path) -> Result<()> {
    tracing::debug!(
        "Running {program} with args: {:?}",
        cmd.get_args().collect::<Vec<_>>()
    );

    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .change_context(Error::SchemaCompiler(format!("failed to start {program}")))
        .attach(format!("Schema file: {}", schema_file.display()))?;

    if !status.success() {
        return Err(Report::new(Error::SchemaCompiler(format!(
            "{program} exited with {status}"
        )))
        .attach(format!("Schema file: {}", schema_file.display())));
    }

    tracing::info!("Compiled {}", schema_file.display());
    Ok(())
}
