//! Go bridging code
//!
//! Everything that turns resolved methods into Go source: the conversion statements between
//! native values and `protoc-gen-go` bindings, and the server and client stubs that use them.

mod convert;
mod decode;
#[cfg(test)]
pub(crate) mod dynamic;
mod encode;
mod naming;
mod stubs;
mod writer;

pub(crate) use stubs::{GoFile, StubTarget, write_client, write_server};

use crate::context::GenerationContext;
use crate::error::Result;

/// Render the stubs the configuration asks for, server first
pub(crate) fn generate_stubs(
    ctx: &mut GenerationContext,
    target: &StubTarget<'_>,
) -> Result<Vec<GoFile>> {
    let mut files = Vec::with_capacity(2);
    if ctx.config().emit_server {
        files.push(write_server(ctx, target)?);
    }
    if ctx.config().emit_client {
        files.push(write_client(ctx, target)?);
    }
    Ok(files)
}
