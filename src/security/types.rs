/*!
 * Security Types
 * Errors raised while resolving script capabilities
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loader operation result
///
/// # Must Use
/// Loader operations can fail and must be handled to prevent capability leaks
pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum LoaderError {
    #[error("package table is missing")]
    #[diagnostic(code(loader::package_missing))]
    PackageMissing,

    #[error("package.loaded table is missing")]
    #[diagnostic(code(loader::loaded_missing))]
    LoadedMissing,

    #[error("require() external modules are disabled")]
    #[diagnostic(
        code(loader::external_disabled),
        help("Configure require_path to allow modules from a trusted directory.")
    )]
    ExternalDisabled,

    #[error("invalid module name '{0}'")]
    #[diagnostic(
        code(loader::invalid_name),
        help("Module names may only contain letters, digits and underscores.")
    )]
    InvalidName(String),

    #[error("require_path exceeded {0}")]
    #[diagnostic(code(loader::path_too_long))]
    PathTooLong(usize),

    #[error("failed to open library '{name}': {reason}")]
    #[diagnostic(code(loader::library))]
    Library { name: String, reason: String },

    /// Engine diagnostic from loading the module file, verbatim
    #[error("{0}")]
    #[diagnostic(code(loader::load_failed))]
    Load(String),
}
