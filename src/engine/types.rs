/*!
 * Engine Types
 * Errors, hook events and built-in library identifiers shared with engine backends
 */

use crate::core::errors::{FatalError, SandboxError};
use crate::memory::MemoryError;
use thiserror::Error;

/// Engine operation result
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by an engine backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Abort raised by the host, passed back unchanged
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// Allocation refused by the allocation guard
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Script runtime error
    #[error("{0}")]
    Runtime(String),

    /// Chunk failed to compile, formatted `path:line: message`
    #[error("{0}")]
    Syntax(String),

    #[error("cannot open {0}")]
    Io(String),

    #[error("attempt to call a nil value (global '{0}')")]
    UndefinedFunction(String),

    #[error("engine is closed")]
    Closed,
}

impl EngineError {
    /// Map back to the host's error, unwrapping host-raised aborts
    pub fn into_sandbox_error(self) -> SandboxError {
        match self {
            EngineError::Fatal(fatal) => fatal.into_inner(),
            EngineError::Memory(err) => SandboxError::Memory(err),
            other => SandboxError::Engine(other.to_string()),
        }
    }
}

/// Debug-hook events an engine may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Call,
    Return,
    Line,
    /// Instruction-count interval elapsed
    Count,
}

/// Built-in libraries an engine knows how to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinLibrary {
    /// Base functions, opened into the global table
    Base,
    String,
    Math,
    Table,
    Os,
    CircularBuffer,
    BloomFilter,
    HyperLogLog,
    Lpeg,
    Protobuf,
    Json,
}
