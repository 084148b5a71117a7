//! Parsed-file and parsed-package caches
//!
//! Every Go file is parsed at most once per run and every package directory is read at most once;
//! both caches live here and are owned by the generation context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use error_stack::{Report, ResultExt};
use itertools::Itertools;

use crate::descriptor::QualifiedName;
use crate::error::{Error, Result};
use crate::go_syntax::ast::{SourceFile, TypeSpec};
use crate::go_syntax::parse_source;
use crate::locator::{LocatedPackage, ModuleLocator, ModuleRef};

/// One Go package: every non-test file in a directory sharing the first file's package clause
#[derive(Debug)]
pub(crate) struct Package {
    pub import_path: String,
    pub name:        String,
    pub module:      ModuleRef,
    pub dir:         PathBuf,
    pub files:       Vec<Rc<SourceFile>>,
}

impl Package {
    pub(crate) fn type_spec(&self, name: &str) -> Option<(Rc<SourceFile>, TypeSpec)> {
        self.files.iter().find_map(|file| {
            file.type_spec(name)
                .map(|spec| (Rc::clone(file), spec.clone()))
        })
    }

    pub(crate) fn qualified(&self, name: &str) -> QualifiedName {
        QualifiedName::new(&self.module.path, &self.import_path, name)
    }
}

pub(crate) struct SourceLoader {
    locator:  ModuleLocator,
    files:    HashMap<PathBuf, Rc<SourceFile>>,
    packages: HashMap<String, Rc<Package>>,
    /// Directory used to resolve packages no reference site has introduced yet
    origin:   Option<PathBuf>,
}

impl SourceLoader {
    pub(crate) fn new(locator: ModuleLocator) -> Self {
        Self {
            locator,
            files: HashMap::new(),
            packages: HashMap::new(),
            origin: None,
        }
    }

    pub(crate) const fn locator(&mut self) -> &mut ModuleLocator { &mut self.locator }

    pub(crate) fn set_origin(&mut self, dir: &Path) { self.origin = Some(dir.to_path_buf()); }

    pub(crate) fn parse_file(&mut self, path: &Path) -> Result<Rc<SourceFile>> {
        if let Some(file) = self.files.get(path) {
            return Ok(Rc::clone(file));
        }
        let source = std::fs::read_to_string(path)
            .map_err(|error| Report::new(Error::io_failed("read", path, error)))?;
        let file = Rc::new(parse_source(path, &source)?);
        tracing::trace!("Parsed {} (package {})", path.display(), file.package);
        self.files.insert(path.to_path_buf(), Rc::clone(&file));
        Ok(file)
    }

    /// The package whose source is in `dir`
    pub(crate) fn load_dir(&mut self, dir: &Path) -> Result<Rc<Package>> {
        let located = self.locator.package_at(dir)?;
        self.load(located)
    }

    /// The package `import_path` names when written in a file inside `from_dir`
    pub(crate) fn import(&mut self, import_path: &str, from_dir: &Path) -> Result<Rc<Package>> {
        if let Some(package) = self.packages.get(import_path) {
            return Ok(Rc::clone(package));
        }
        let located = self.locator.locate(import_path, from_dir)?;
        self.load(located)
    }

    /// A package by import path, locating it from the origin directory when it is not loaded yet
    pub(crate) fn package(&mut self, import_path: &str) -> Result<Rc<Package>> {
        if let Some(package) = self.packages.get(import_path) {
            return Ok(Rc::clone(package));
        }
        let Some(origin) = self.origin.clone() else {
            return Err(Report::new(Error::PackageNotFound(import_path.to_string())));
        };
        self.import(import_path, &origin)
    }

    fn load(&mut self, located: LocatedPackage) -> Result<Rc<Package>> {
        if let Some(package) = self.packages.get(&located.import_path) {
            return Ok(Rc::clone(package));
        }

        let entries = std::fs::read_dir(&located.dir)
            .map_err(|error| Report::new(Error::io_failed("read directory", &located.dir, error)))?;
        let paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|extension| extension == "go")
                    && !path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with("_test.go"))
            })
            .sorted()
            .collect();

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            let file = self
                .parse_file(path)
                .attach(format!("while loading package {}", located.import_path))?;
            files.push(file);
        }

        let Some(name) = files.first().map(|file| file.package.clone()) else {
            return Err(Report::new(Error::PackageNotFound(format!(
                "{}: no Go files in {}",
                located.import_path,
                located.dir.display()
            ))));
        };
        files.retain(|file| file.package == name);

        tracing::debug!(
            "Loaded package {} ({name}) with {} files",
            located.import_path,
            files.len()
        );
        let package = Rc::new(Package {
            import_path: located.import_path,
            name,
            module: located.module,
            dir: located.dir,
            files,
        });
        self.packages
            .insert(package.import_path.clone(), Rc::clone(&package));
        Ok(package)
    }
}
