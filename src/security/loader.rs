/*!
 * Capability Loader
 *
 * Resolves `require(name)` for scripts. Built-in libraries come from the
 * descriptor table with their deny-lists stripped; anything else is loaded from
 * the trusted module root, if one is configured.
 *
 * Results are cached in `package.loaded`. A placeholder is stored under the
 * name before a load starts, so a module that requires itself (directly or
 * through a cycle) sees the placeholder instead of recursing.
 */

use super::library::{self, LibraryDescriptor, BASE_LIBRARY};
use super::path::{module_path, validate_module_name};
use super::types::{LoaderError, LoaderResult};
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::{LOADED_TABLE, PACKAGE_TABLE};
use crate::engine::{EngineError, ScriptEngine, ScriptHost, TableRef, TableTag, Value};
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cache value marking a module as loading
pub const LOADING_PLACEHOLDER: Value = Value::Boolean(true);

#[derive(Debug, Clone, Default)]
pub struct CapabilityLoader {
    /// Trusted root for external modules; `None` disables them
    require_path: Option<PathBuf>,
}

impl CapabilityLoader {
    pub fn new(require_path: Option<PathBuf>) -> Self {
        Self {
            require_path: require_path.map(|p| p.clean()),
        }
    }

    pub fn require_path(&self) -> Option<&Path> {
        self.require_path.as_deref()
    }

    /// Open the base library into the globals, strip its deny-list and create
    /// the module cache
    pub fn install(&self, engine: &mut dyn ScriptEngine) -> LoaderResult<()> {
        let globals = engine
            .open_library(BASE_LIBRARY.library)
            .map_err(|e| LoaderError::Library {
                name: "base".to_string(),
                reason: e.to_string(),
            })?;
        for member in BASE_LIBRARY.deny {
            globals.remove_field(member);
        }

        let package = match globals.get_field(PACKAGE_TABLE) {
            Value::Table(t) => t,
            _ => {
                let t = TableRef::new();
                globals.set_field(PACKAGE_TABLE, Value::Table(t.clone()));
                t
            }
        };
        if !matches!(package.get_field(LOADED_TABLE), Value::Table(_)) {
            package.set_field(LOADED_TABLE, Value::Table(TableRef::new()));
        }

        info!(
            external_modules = self.require_path.is_some(),
            "Capability loader installed"
        );
        Ok(())
    }

    /// The `package.loaded` table
    pub fn module_cache(&self, engine: &dyn ScriptEngine) -> LoaderResult<TableRef> {
        let package = match engine.globals().get_field(PACKAGE_TABLE) {
            Value::Table(t) => t,
            _ => return Err(LoaderError::PackageMissing),
        };
        match package.get_field(LOADED_TABLE) {
            Value::Table(t) => Ok(t),
            _ => Err(LoaderError::LoadedMissing),
        }
    }

    /// Resolve `name`, loading it at most once per instance
    ///
    /// `host` receives callbacks made by an external module's chunk while it runs.
    pub fn require(
        &self,
        engine: &mut dyn ScriptEngine,
        host: &mut dyn ScriptHost,
        name: &str,
    ) -> SandboxResult<Value> {
        let cache = self.module_cache(engine)?;

        let cached = cache.get_field(name);
        if !cached.is_nil() {
            debug!(module = name, "Module cache hit");
            return Ok(cached);
        }

        cache.set_field(name, LOADING_PLACEHOLDER);
        match self.resolve(engine, host, name) {
            Ok(value) => {
                cache.set_field(name, value.clone());
                debug!(module = name, "Module loaded");
                Ok(value)
            }
            Err(err) => {
                cache.remove_field(name);
                warn!(module = name, error = %err, "Module load failed");
                Err(err)
            }
        }
    }

    fn resolve(
        &self,
        engine: &mut dyn ScriptEngine,
        host: &mut dyn ScriptHost,
        name: &str,
    ) -> SandboxResult<Value> {
        if let Some(descriptor) = library::find(name) {
            return Ok(self.open_library(engine, descriptor)?);
        }

        let root = self
            .require_path
            .as_deref()
            .ok_or(LoaderError::ExternalDisabled)?;
        validate_module_name(name)?;
        let path = module_path(root, name)?;

        let value = engine.load_file(&path, host).map_err(|err| match err {
            EngineError::Fatal(fatal) => fatal.into_inner(),
            other => SandboxError::Loader(LoaderError::Load(other.to_string())),
        })?;

        Ok(match value {
            Value::Nil => LOADING_PLACEHOLDER,
            Value::Table(t) => {
                t.set_tag(TableTag::Library);
                Value::Table(t)
            }
            other => other,
        })
    }

    fn open_library(
        &self,
        engine: &mut dyn ScriptEngine,
        descriptor: &LibraryDescriptor,
    ) -> LoaderResult<Value> {
        let table = engine
            .open_library(descriptor.library)
            .map_err(|e| LoaderError::Library {
                name: descriptor.name.to_string(),
                reason: e.to_string(),
            })?;
        for member in descriptor.deny {
            table.remove_field(member);
        }
        table.set_tag(TableTag::Library);

        if descriptor.publish_global {
            engine
                .globals()
                .set_field(descriptor.name, Value::Table(table.clone()));
        }
        Ok(Value::Table(table))
    }
}
