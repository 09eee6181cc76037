/*!
 * Engine Module
 * Script-engine abstraction, value model and simulation backend
 */

pub mod simulation;
pub mod traits;
pub mod types;
pub mod value;

pub use simulation::{evaluate_manifest, SimulatedEngine, BASE_STATE_SIZE};
pub use traits::{ScriptEngine, ScriptHost};
pub use types::{BuiltinLibrary, EngineError, EngineResult, HookEvent};
pub use value::{Function, Key, NativeObject, TableRef, TableTag, Value};
