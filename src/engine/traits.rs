/*!
 * Engine Traits
 * The seam between the sandbox policy layer and an embedded interpreter
 */

use super::types::{BuiltinLibrary, EngineResult, HookEvent};
use super::value::{TableRef, Value};
use crate::core::errors::FatalError;
use std::path::Path;

/// Embedded interpreter driven by a sandbox
///
/// Implementations own the script namespace. Every script-visible callback into
/// the sandbox goes through the [`ScriptHost`] handed to `load_file` and
/// `call_function`; a `FatalError` returned by the host must unwind the current
/// call and come back out as [`EngineError::Fatal`](super::EngineError::Fatal).
pub trait ScriptEngine: Send {
    /// Arm the count hook to fire every `interval` instructions
    fn set_instruction_hook(&mut self, interval: u32);

    fn clear_instruction_hook(&mut self);

    /// Configured hook interval, 0 when no hook is armed
    fn hook_count(&self) -> u32;

    /// Instructions left before the hook next fires
    fn hook_count_remaining(&self) -> u32;

    /// The global namespace
    fn globals(&self) -> TableRef;

    /// Open a built-in library and return its table
    ///
    /// `BuiltinLibrary::Base` installs into the global table and returns it.
    fn open_library(&mut self, library: BuiltinLibrary) -> EngineResult<TableRef>;

    /// Compile and run a chunk file, returning its result
    fn load_file(&mut self, path: &Path, host: &mut dyn ScriptHost) -> EngineResult<Value>;

    /// Call a global function
    fn call_function(
        &mut self,
        name: &str,
        args: &[Value],
        host: &mut dyn ScriptHost,
    ) -> EngineResult<Value>;

    /// Release all engine state; the engine must not be used afterwards
    fn close(&mut self);
}

/// Sandbox services exposed to running scripts
pub trait ScriptHost {
    /// `output(...)`
    fn emit(&mut self, args: &[Value]) -> Result<(), FatalError>;

    /// `require(name)`
    fn require(&mut self, engine: &mut dyn ScriptEngine, name: &str) -> Result<Value, FatalError>;

    /// Debug hook callback
    fn instruction_hook(&mut self, event: HookEvent) -> Result<(), FatalError>;
}
