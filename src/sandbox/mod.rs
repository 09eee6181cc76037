/*!
 * Sandbox Module
 * Script instances, their configuration and the host-side registry
 */

pub mod config;
pub mod instance;
pub mod manager;
pub mod types;

pub use config::SandboxConfig;
pub use instance::{Sandbox, SandboxCore};
pub use manager::{SandboxHandle, SandboxManager};
pub use types::SandboxStats;
