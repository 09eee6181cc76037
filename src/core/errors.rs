/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::limits::ERROR_MESSAGE_SIZE;
use super::types::{SandboxId, SandboxState};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export subsystem errors
pub use crate::execution::InstructionError;
pub use crate::memory::MemoryError;
pub use crate::output::OutputError;
pub use crate::security::LoaderError;

/// Unified sandbox error type with miette diagnostics
///
/// Subsystem errors are transparent so the text a script author sees is the
/// subsystem's own message (e.g. `instruction_limit exceeded`).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SandboxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Instruction(#[from] InstructionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] LoaderError),

    /// Engine-reported runtime error, text propagated verbatim
    #[error("{0}")]
    #[diagnostic(
        code(sandbox::engine_error),
        help("The script raised an error. The message is the engine's own diagnostic.")
    )]
    Engine(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(sandbox::invalid_config),
        help("Review the sandbox configuration values.")
    )]
    InvalidConfig(String),

    #[error("sandbox is {actual}, expected {expected}")]
    #[diagnostic(
        code(sandbox::invalid_state),
        help("Initialize the sandbox before calling into it.")
    )]
    InvalidState {
        expected: SandboxState,
        actual: SandboxState,
    },

    #[error("sandbox {0} not found")]
    #[diagnostic(code(sandbox::not_found))]
    NotFound(SandboxId),

    #[error("sandbox terminated")]
    #[diagnostic(
        code(sandbox::terminated),
        help("A terminated sandbox cannot be reused. Provision a new instance.")
    )]
    Terminated,
}

impl SandboxError {
    /// Whether this error is a policy-driven quota rejection
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            SandboxError::Memory(MemoryError::LimitExceeded { .. })
                | SandboxError::Instruction(InstructionError::LimitExceeded { .. })
                | SandboxError::Output(OutputError::LimitExceeded { .. })
        )
    }
}

/// Result type for sandbox operations
///
/// # Must Use
/// Sandbox operations can fail and must be handled
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;

/// Abort signal carried through the engine's fatal-error channel
///
/// Produced only by the script-call boundary; the engine must unwind the
/// current call when it receives one and hand it back unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct FatalError(SandboxError);

impl FatalError {
    pub fn new(err: impl Into<SandboxError>) -> Self {
        Self(err.into())
    }

    pub fn error(&self) -> &SandboxError {
        &self.0
    }

    pub fn into_inner(self) -> SandboxError {
        self.0
    }
}

impl From<SandboxError> for FatalError {
    fn from(err: SandboxError) -> Self {
        Self(err)
    }
}

/// Bounded last-error slot
///
/// Holds at most `ERROR_MESSAGE_SIZE - 1` bytes, truncated on a char boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMessage(String);

impl ErrorMessage {
    pub fn new(message: &str) -> Self {
        let max = ERROR_MESSAGE_SIZE - 1;
        if message.len() <= max {
            return Self(message.to_string());
        }
        let mut end = max;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        Self(message[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl std::fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
