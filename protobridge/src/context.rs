//! Per-run generation state
//!
//! Everything one generation run caches lives in [`GenerationContext`]: parsed files and
//! packages, lowered struct definitions, the resolution cache and the schema package names handed
//! out so far. A run creates one, passes it by reference to every stage and drops it at the end.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use heck::ToSnakeCase;

use crate::config::GenerationConfig;
use crate::descriptor::{QualifiedName, StructDef};
use crate::error::Result;
use crate::locator::ModuleLocator;
use crate::resolver::ResolutionCache;
use crate::source::{Lowerer, SourceLoader};

/// Unique schema package name per Go import path
#[derive(Debug, Default)]
struct SchemaPackages {
    by_import: HashMap<String, String>,
    used:      HashSet<String>,
}

impl SchemaPackages {
    /// Snake-cased Go package name, with a numeric suffix when another import path already has it
    fn assign(&mut self, import_path: &str, go_name: &str) -> String {
        if let Some(existing) = self.by_import.get(import_path) {
            return existing.clone();
        }
        let base = go_name.to_snake_case();
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{base}{suffix}");
            suffix += 1;
        }
        tracing::debug!("Schema package {candidate} assigned to {import_path}");
        self.used.insert(candidate.clone());
        self.by_import
            .insert(import_path.to_string(), candidate.clone());
        candidate
    }
}

pub(crate) struct GenerationContext {
    config:          GenerationConfig,
    sources:         SourceLoader,
    types:           HashMap<QualifiedName, Rc<StructDef>>,
    cache:           ResolutionCache,
    schema_packages: SchemaPackages,
}

impl GenerationContext {
    pub(crate) fn new(config: GenerationConfig) -> Self {
        let locator = ModuleLocator::new(config.module_cache.clone(), config.goroot.clone());
        Self {
            config,
            sources: SourceLoader::new(locator),
            types: HashMap::new(),
            cache: ResolutionCache::default(),
            schema_packages: SchemaPackages::default(),
        }
    }

    pub(crate) const fn config(&self) -> &GenerationConfig { &self.config }

    pub(crate) const fn sources(&mut self) -> &mut SourceLoader { &mut self.sources }

    pub(crate) const fn cache(&self) -> &ResolutionCache { &self.cache }

    pub(crate) const fn cache_mut(&mut self) -> &mut ResolutionCache { &mut self.cache }

    /// Make a struct definition known without reading source
    #[cfg(test)]
    pub(crate) fn register_struct(&mut self, def: StructDef) {
        self.types.insert(def.id.clone(), Rc::new(def));
    }

    /// Field list for `id`, lowered from source the first time it is asked for
    pub(crate) fn struct_def(&mut self, id: &QualifiedName) -> Result<Rc<StructDef>> {
        if let Some(def) = self.types.get(id) {
            return Ok(Rc::clone(def));
        }
        let def = Rc::new(Lowerer::new(&mut self.sources).struct_def(id)?);
        self.types.insert(id.clone(), Rc::clone(&def));
        Ok(def)
    }

    pub(crate) fn schema_package(&mut self, import_path: &str, go_name: &str) -> String {
        self.schema_packages.assign(import_path, go_name)
    }

    /// Schema package already assigned to `import_path`
    pub(crate) fn schema_package_of(&self, import_path: &str) -> Option<&str> {
        self.schema_packages
            .by_import
            .get(import_path)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_package_suffixes() {
        let mut packages = SchemaPackages::default();
        assert_eq!(packages.assign("example.org/app/account", "account"), "account");
        assert_eq!(packages.assign("example.org/other/account", "account"), "account2");
        assert_eq!(packages.assign("example.org/third/account", "account"), "account3");
        assert_eq!(packages.assign("example.org/app/account", "account"), "account");
        assert_eq!(packages.assign("example.org/app/userData", "userData"), "user_data");
    }
}
