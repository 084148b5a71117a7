//! Go source access: package loading, type lowering and service discovery

mod discover;
mod loader;
mod lowering;

pub(crate) use discover::discover_service;
pub(crate) use loader::SourceLoader;
pub(crate) use lowering::{Lowerer, default_package_name};
