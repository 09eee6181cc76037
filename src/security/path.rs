/*!
 * Module Path Handling
 *
 * External module names come straight from scripts. They are checked against
 * a strict character set before any path is composed, so a name can never
 * escape the trusted root.
 */

use super::types::{LoaderError, LoaderResult};
use crate::core::limits::{MAX_MODULE_PATH, MODULE_EXTENSION};
use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

/// Accept only non-empty `[A-Za-z0-9_]+`
pub fn validate_module_name(name: &str) -> LoaderResult<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(LoaderError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `<root><sep><name>.lua`, bounded by [`MAX_MODULE_PATH`]
///
/// `name` must already be validated.
pub fn module_path(root: &Path, name: &str) -> LoaderResult<PathBuf> {
    let mut path = OsString::from(root.as_os_str());
    path.push(MAIN_SEPARATOR_STR);
    path.push(name);
    path.push(".");
    path.push(MODULE_EXTENSION);

    if path.len() >= MAX_MODULE_PATH {
        return Err(LoaderError::PathTooLong(MAX_MODULE_PATH));
    }
    Ok(PathBuf::from(path))
}
