//! Generation settings
//!
//! Everything environment-dependent is read once in [`GoEnvironment::capture`]; the rest of the
//! crate only ever sees the resolved values carried by the generation context.

use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_OUTPUT_DIR: &str = "gen";
const DEFAULT_COMPILER: &str = "protoc";

/// External schema compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CompilerConfig {
    pub program:    String,
    pub enabled:    bool,
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program:    DEFAULT_COMPILER.to_string(),
            enabled:    true,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GenerationConfig {
    pub output_dir:      PathBuf,
    /// Import path prefix for `option go_package`; derived from the main module when absent
    pub go_package_base: Option<String>,
    pub module_cache:    PathBuf,
    pub goroot:          Option<PathBuf>,
    pub compiler:        CompilerConfig,
    pub emit_server:     bool,
    pub emit_client:     bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            output_dir:      PathBuf::from(DEFAULT_OUTPUT_DIR),
            go_package_base: None,
            module_cache:    PathBuf::new(),
            goroot:          None,
            compiler:        CompilerConfig::default(),
            emit_server:     true,
            emit_client:     true,
        }
    }
}

/// Snapshot of the Go-related environment variables
#[derive(Debug, Clone, Default)]
pub(crate) struct GoEnvironment {
    pub gomodcache: Option<String>,
    pub gopath:     Option<String>,
    pub home:       Option<String>,
    pub goroot:     Option<String>,
}

impl GoEnvironment {
    pub(crate) fn capture() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            gomodcache: read("GOMODCACHE"),
            gopath:     read("GOPATH"),
            home:       read("HOME"),
            goroot:     read("GOROOT"),
        }
    }

    /// `$GOMODCACHE`, else the first `$GOPATH` entry plus `pkg/mod`, else `$HOME/go/pkg/mod`
    pub(crate) fn module_cache(&self) -> Option<PathBuf> {
        if let Some(cache) = &self.gomodcache {
            return Some(PathBuf::from(cache));
        }
        if let Some(first) = self
            .gopath
            .as_deref()
            .and_then(|gopath| std::env::split_paths(gopath).next())
        {
            return Some(first.join("pkg").join("mod"));
        }
        self.home
            .as_ref()
            .map(|home| Path::new(home).join("go").join("pkg").join("mod"))
    }
}

impl GenerationConfig {
    /// Defaults with the module cache and GOROOT taken from `environment`
    pub(crate) fn from_environment(environment: &GoEnvironment) -> Result<Self> {
        let module_cache = environment.module_cache().ok_or_else(|| {
            Report::new(Error::invalid(
                "module cache",
                "none of GOMODCACHE, GOPATH or HOME is set",
            ))
        })?;
        Ok(Self {
            module_cache,
            goroot: environment.goroot.as_ref().map(PathBuf::from),
            ..Self::default()
        })
    }

    /// Overlay settings from a JSON file onto environment-derived defaults
    pub(crate) fn load(path: &Path, environment: &GoEnvironment) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|error| Report::new(Error::io_failed("read config", path, error)))?;
        let mut config: Self = serde_json::from_str(&contents)
            .map_err(|error| Report::new(Error::invalid("config file", error)))
            .attach(format!("config file: {}", path.display()))?;

        if config.module_cache.as_os_str().is_empty() {
            config.module_cache = Self::from_environment(environment)?.module_cache;
        }
        if config.goroot.is_none() {
            config.goroot = environment.goroot.as_ref().map(PathBuf::from);
        }
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Report::new(Error::invalid("output directory", "empty path")));
        }
        if self.module_cache.as_os_str().is_empty() {
            return Err(Report::new(Error::invalid("module cache", "empty path")));
        }
        if self.compiler.enabled && self.compiler.program.trim().is_empty() {
            return Err(Report::new(Error::invalid(
                "schema compiler",
                "program name is empty",
            )));
        }
        if let Some(base) = &self.go_package_base
            && (base.is_empty() || base.ends_with('/'))
        {
            return Err(Report::new(Error::invalid(
                "go package base",
                format!("{base:?} must be a non-empty import path without a trailing '/'"),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn test_module_cache_precedence() {
        let environment = GoEnvironment {
            gomodcache: Some("/cache".to_string()),
            gopath:     Some("/gopath".to_string()),
            home:       Some("/home/dev".to_string()),
            goroot:     None,
        };
        assert_eq!(environment.module_cache(), Some(PathBuf::from("/cache")));

        let environment = GoEnvironment {
            gomodcache: None,
            ..environment
        };
        assert_eq!(
            environment.module_cache(),
            Some(PathBuf::from("/gopath/pkg/mod"))
        );

        let environment = GoEnvironment {
            gopath: None,
            ..environment
        };
        assert_eq!(
            environment.module_cache(),
            Some(PathBuf::from("/home/dev/go/pkg/mod"))
        );

        assert_eq!(GoEnvironment::default().module_cache(), None);
    }

    #[test]
    fn test_from_environment_requires_a_cache() {
        let error = GenerationConfig::from_environment(&GoEnvironment::default()).unwrap_err();
        assert!(matches!(
            error.current_context(),
            Error::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn test_load_overlays_file_on_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protobridge.json");
        std::fs::write(
            &path,
            r#"{ "output_dir": "out", "compiler": { "enabled": false }, "emit_client": false }"#,
        )
        .unwrap();
        let environment = GoEnvironment {
            gomodcache: Some("/cache".to_string()),
            goroot: Some("/usr/local/go".to_string()),
            ..GoEnvironment::default()
        };

        let config = GenerationConfig::load(&path, &environment).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.module_cache, PathBuf::from("/cache"));
        assert_eq!(config.goroot, Some(PathBuf::from("/usr/local/go")));
        assert!(!config.compiler.enabled);
        assert_eq!(config.compiler.program, "protoc");
        assert!(config.emit_server);
        assert!(!config.emit_client);
    }

    #[test]
    fn test_validate_rejects_trailing_slash_base() {
        let config = GenerationConfig {
            module_cache: PathBuf::from("/cache"),
            go_package_base: Some("example.org/app/".to_string()),
            ..GenerationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
