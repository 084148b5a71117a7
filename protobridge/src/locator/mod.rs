//! Module locator
//!
//! Maps an import path seen at a reference site to the directory holding that package's source:
//! the main module itself, a `replace`d directory, a standard-library package under GOROOT, or a
//! dependency version extracted into the Go module cache.

mod manifest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use error_stack::{Report, ResultExt};
use manifest::{MANIFEST_FILE, Manifest, ReplacementTarget, parse_manifest};

use crate::descriptor::STD_MODULE;
use crate::error::{Error, Result};

/// A module version whose source tree lives at `root`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModuleRef {
    pub path:    String,
    /// `None` for the main module, local replacements and the standard library
    pub version: Option<String>,
    pub root:    PathBuf,
}

/// Where one package's source lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocatedPackage {
    pub import_path: String,
    pub module:      ModuleRef,
    pub dir:         PathBuf,
}

/// Module-cache case encoding: each upper-case ASCII letter becomes `!` plus its lower-case form
pub(crate) fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Standard-library import paths have no dot in their first element
pub(crate) fn is_standard_library(import_path: &str) -> bool {
    import_path
        .split('/')
        .next()
        .is_some_and(|first| !first.contains('.'))
}

/// Remainder of `import_path` below `module`, when the module contains it
fn path_within<'a>(import_path: &'a str, module: &str) -> Option<&'a str> {
    if import_path == module {
        Some("")
    } else {
        import_path
            .strip_prefix(module)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

fn join_import_path(root: &Path, rest: &str) -> PathBuf {
    rest.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|error| Report::new(Error::io_failed("resolve", path, error)))
}

pub(crate) struct ModuleLocator {
    module_cache: PathBuf,
    goroot:       Option<PathBuf>,
    /// Parsed manifests keyed by the directory holding them
    manifests:    HashMap<PathBuf, Rc<Manifest>>,
}

impl ModuleLocator {
    pub(crate) fn new(module_cache: PathBuf, goroot: Option<PathBuf>) -> Self {
        Self {
            module_cache,
            goroot,
            manifests: HashMap::new(),
        }
    }

    /// Nearest `go.mod` at or above `start`
    pub(crate) fn find_manifest(&mut self, start: &Path) -> Result<Rc<Manifest>> {
        let start = absolute(start)?;
        for dir in start.ancestors() {
            if let Some(manifest) = self.manifests.get(dir) {
                return Ok(Rc::clone(manifest));
            }
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let contents = std::fs::read_to_string(&candidate).map_err(|error| {
                    Report::new(Error::io_failed("read", &candidate, error))
                })?;
                let manifest = Rc::new(parse_manifest(&candidate, dir, &contents)?);
                tracing::debug!(
                    "Loaded manifest for module {} (go {}) at {}",
                    manifest.module,
                    manifest.go_version.as_deref().unwrap_or("unspecified"),
                    candidate.display()
                );
                self.manifests
                    .insert(dir.to_path_buf(), Rc::clone(&manifest));
                return Ok(manifest);
            }
        }
        Err(Report::new(Error::ManifestNotFound(
            start.display().to_string(),
        )))
    }

    /// Resolve `import_path` as written in a file inside `from_dir`
    pub(crate) fn locate(&mut self, import_path: &str, from_dir: &Path) -> Result<LocatedPackage> {
        if is_standard_library(import_path) {
            return self.locate_standard(import_path);
        }

        let manifest = self.find_manifest(from_dir)?;
        let located = if let Some(rest) = path_within(import_path, &manifest.module) {
            LocatedPackage {
                import_path: import_path.to_string(),
                module:      ModuleRef {
                    path:    manifest.module.clone(),
                    version: self.cached_version(&manifest.dir),
                    root:    manifest.dir.clone(),
                },
                dir:         join_import_path(&manifest.dir, rest),
            }
        } else {
            self.locate_dependency(import_path, &manifest)?
        };

        if !located.dir.is_dir() {
            return Err(Report::new(Error::PackageNotFound(format!(
                "{import_path}: {} does not exist",
                located.dir.display()
            ))));
        }
        tracing::debug!(
            "Located {import_path} in module {}@{} at {}",
            located.module.path,
            located.module.version.as_deref().unwrap_or("local"),
            located.dir.display()
        );
        Ok(located)
    }

    fn locate_dependency(&self, import_path: &str, manifest: &Manifest) -> Result<LocatedPackage> {
        let requirement = manifest
            .requires
            .iter()
            .filter(|requirement| path_within(import_path, &requirement.path).is_some())
            .max_by_key(|requirement| requirement.path.len())
            .ok_or_else(|| {
                Report::new(Error::PackageNotFound(format!(
                    "no requirement in {} provides {import_path}",
                    manifest.dir.join(MANIFEST_FILE).display()
                )))
            })?;
        let rest = path_within(import_path, &requirement.path).unwrap_or_default();
        if requirement.indirect {
            tracing::trace!(
                "{import_path} is provided by indirect requirement {}",
                requirement.path
            );
        }

        let module = match manifest.replacement_for(&requirement.path, &requirement.version) {
            Some(ReplacementTarget::Directory(dir)) => ModuleRef {
                path:    requirement.path.clone(),
                version: None,
                root:    manifest.dir.join(dir),
            },
            Some(ReplacementTarget::Module { path, version }) => ModuleRef {
                path:    requirement.path.clone(),
                version: Some(version.clone()),
                root:    self.cache_root(path, version),
            },
            None => ModuleRef {
                path:    requirement.path.clone(),
                version: Some(requirement.version.clone()),
                root:    self.cache_root(&requirement.path, &requirement.version),
            },
        };

        Ok(LocatedPackage {
            import_path: import_path.to_string(),
            dir: join_import_path(&module.root, rest),
            module,
        })
    }

    fn locate_standard(&self, import_path: &str) -> Result<LocatedPackage> {
        let Some(goroot) = &self.goroot else {
            return Err(Report::new(Error::PackageNotFound(format!(
                "{import_path} is a standard library package and GOROOT is not configured"
            ))));
        };
        let root = goroot.join("src");
        let dir = join_import_path(&root, import_path);
        if !dir.is_dir() {
            return Err(Report::new(Error::PackageNotFound(format!(
                "{import_path}: {} does not exist",
                dir.display()
            ))));
        }
        Ok(LocatedPackage {
            import_path: import_path.to_string(),
            module: ModuleRef {
                path: STD_MODULE.to_string(),
                version: None,
                root,
            },
            dir,
        })
    }

    /// `<cache>/<escaped path>@<escaped version>`
    pub(crate) fn cache_root(&self, path: &str, version: &str) -> PathBuf {
        join_import_path(
            &self.module_cache,
            &format!("{}@{}", escape_path(path), escape_path(version)),
        )
    }

    /// Version suffix of a module root extracted into the cache
    fn cached_version(&self, root: &Path) -> Option<String> {
        if !root.starts_with(&self.module_cache) {
            return None;
        }
        root.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once('@'))
            .map(|(_, version)| version.to_string())
    }

    /// Identity of the package whose source is in `dir`
    pub(crate) fn package_at(&mut self, dir: &Path) -> Result<LocatedPackage> {
        let dir = absolute(dir)?;

        if let Some(goroot) = &self.goroot {
            let root = goroot.join("src");
            if let Ok(rest) = dir.strip_prefix(&root) {
                return Ok(LocatedPackage {
                    import_path: slash_path(rest),
                    module: ModuleRef {
                        path: STD_MODULE.to_string(),
                        version: None,
                        root,
                    },
                    dir,
                });
            }
        }

        let manifest = self
            .find_manifest(&dir)
            .attach(format!("while identifying the package in {}", dir.display()))?;
        let rest = dir.strip_prefix(&manifest.dir).map(slash_path).unwrap_or_default();
        let import_path = if rest.is_empty() {
            manifest.module.clone()
        } else {
            format!("{}/{rest}", manifest.module)
        };
        Ok(LocatedPackage {
            import_path,
            module: ModuleRef {
                path:    manifest.module.clone(),
                version: self.cached_version(&manifest.dir),
                root:    manifest.dir.clone(),
            },
            dir,
        })
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| component.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}
