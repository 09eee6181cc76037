/*!
 * Core Types
 * Common types used across the sandbox
 */

use serde::{Deserialize, Serialize};

/// Sandbox instance identifier (host-side registry key)
pub type SandboxId = u64;

/// Size type for memory and output accounting
pub type Size = usize;

/// Resource kinds tracked by the quota ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Memory,
    Instruction,
    Output,
}

impl UsageType {
    pub const ALL: [UsageType; 3] = [UsageType::Memory, UsageType::Instruction, UsageType::Output];

    pub fn as_str(self) -> &'static str {
        match self {
            UsageType::Memory => "memory",
            UsageType::Instruction => "instruction",
            UsageType::Output => "output",
        }
    }
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistic selector for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStat {
    /// Configured ceiling, 0 = unlimited
    Limit,
    Current,
    /// Peak observed value
    Maximum,
}

/// Lifecycle state of a sandbox instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    /// Created, engine provisioned, not yet initialized
    Unknown,
    Running,
    /// Terminal: the engine has been released
    Terminated,
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SandboxState::Unknown => write!(f, "UNKNOWN"),
            SandboxState::Running => write!(f, "RUNNING"),
            SandboxState::Terminated => write!(f, "TERMINATED"),
        }
    }
}
