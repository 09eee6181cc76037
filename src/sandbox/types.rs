/*!
 * Sandbox Types
 */

use crate::core::errors::ErrorMessage;
use crate::core::types::{SandboxId, SandboxState};
use crate::memory::LedgerSnapshot;
use serde::{Deserialize, Serialize};

/// Point-in-time report for one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxStats {
    pub id: SandboxId,
    pub state: SandboxState,
    pub usage: LedgerSnapshot,
    #[serde(skip_serializing_if = "ErrorMessage::is_empty", default)]
    pub last_error: ErrorMessage,
}
