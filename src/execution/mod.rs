/*!
 * Execution Module
 * Per-call instruction budgeting
 */

pub mod instruction;

pub use instruction::{InstructionError, InstructionGuard, InstructionResult};
