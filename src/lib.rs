/*!
 * Script Sandbox Library
 * Resource and capability policy for embedded script engines
 */

pub mod core;
pub mod engine;
pub mod execution;
pub mod memory;
pub mod monitoring;
pub mod output;
pub mod sandbox;
pub mod security;

// Re-exports
pub use crate::core::errors::{ErrorMessage, FatalError, SandboxError, SandboxResult};
pub use crate::core::types::{SandboxId, SandboxState, UsageStat, UsageType};
pub use engine::{ScriptEngine, ScriptHost, SimulatedEngine, TableRef, Value};
pub use memory::{AllocationGuard, QuotaLedger};
pub use monitoring::init_tracing;
pub use output::OutputBuffer;
pub use sandbox::{Sandbox, SandboxConfig, SandboxManager, SandboxStats};
pub use security::CapabilityLoader;
