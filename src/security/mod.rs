/*!
 * Security Module
 * Capability loading: built-in allow-list, deny-lists and trusted module roots
 */

pub mod library;
pub mod loader;
pub mod path;
pub mod types;

pub use library::{LibraryDescriptor, BASE_LIBRARY, LIBRARIES};
pub use loader::{CapabilityLoader, LOADING_PLACEHOLDER};
pub use path::{module_path, validate_module_name};
pub use types::*;
