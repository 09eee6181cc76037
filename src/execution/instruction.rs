/*!
 * Instruction Guard
 *
 * Bounds the work a single script call may perform. The engine's count hook
 * fires every `limit` instructions; the first firing within a call means the
 * budget is spent.
 */

use crate::engine::{HookEvent, ScriptEngine};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Instruction guard result
pub type InstructionResult<T> = Result<T, InstructionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum InstructionError {
    #[error("instruction_limit exceeded")]
    #[diagnostic(
        code(execution::instruction_limit),
        help("The call ran past its instruction budget. Reduce per-call work or raise the budget.")
    )]
    LimitExceeded { limit: u32 },
}

/// Per-instance instruction budget, 0 = unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstructionGuard {
    limit: u32,
}

impl InstructionGuard {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    #[inline]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// Arm the engine's count hook for a fresh call
    pub fn arm(&self, engine: &mut dyn ScriptEngine) {
        if self.is_unlimited() {
            engine.clear_instruction_hook();
        } else {
            engine.set_instruction_hook(self.limit);
        }
    }

    /// Hook callback; only the count event is fatal
    pub fn on_hook(&self, event: HookEvent) -> InstructionResult<()> {
        match event {
            HookEvent::Count => {
                warn!(limit = self.limit, "Instruction budget exhausted");
                Err(InstructionError::LimitExceeded { limit: self.limit })
            }
            HookEvent::Call | HookEvent::Return | HookEvent::Line => Ok(()),
        }
    }

    /// Instructions consumed since the hook was last armed
    pub fn usage(&self, engine: &dyn ScriptEngine) -> u32 {
        engine
            .hook_count()
            .saturating_sub(engine.hook_count_remaining())
    }
}
