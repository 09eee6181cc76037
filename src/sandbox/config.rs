/*!
 * Sandbox Configuration
 */

use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::*;
use crate::core::serde::{is_none, optional_pathbuf_string};
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-instance policy
///
/// Every limit uses 0 for unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SandboxConfig {
    /// Memory ceiling in bytes
    pub memory_limit: usize,
    /// Instructions allowed per call
    pub instruction_limit: u32,
    /// Output ceiling in bytes
    pub output_limit: usize,
    pub output_initial_size: usize,
    /// Trusted root for external modules; absent disables them
    #[serde(with = "optional_pathbuf_string", skip_serializing_if = "is_none")]
    pub require_path: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SandboxConfig {
    /// Tight limits for untrusted, short-lived scripts
    pub fn minimal() -> Self {
        Self {
            memory_limit: MINIMAL_MEMORY_LIMIT,
            instruction_limit: MINIMAL_INSTRUCTION_LIMIT,
            output_limit: MINIMAL_OUTPUT_LIMIT,
            output_initial_size: DEFAULT_OUTPUT_SIZE,
            require_path: None,
        }
    }

    pub fn standard() -> Self {
        Self {
            memory_limit: STANDARD_MEMORY_LIMIT,
            instruction_limit: STANDARD_INSTRUCTION_LIMIT,
            output_limit: STANDARD_OUTPUT_LIMIT,
            output_initial_size: DEFAULT_OUTPUT_SIZE,
            require_path: None,
        }
    }

    /// No ceilings at all
    pub fn unlimited() -> Self {
        Self {
            memory_limit: 0,
            instruction_limit: 0,
            output_limit: 0,
            output_initial_size: DEFAULT_OUTPUT_SIZE,
            require_path: None,
        }
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn with_instruction_limit(mut self, instructions: u32) -> Self {
        self.instruction_limit = instructions;
        self
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }

    pub fn with_output_initial_size(mut self, bytes: usize) -> Self {
        self.output_initial_size = bytes;
        self
    }

    pub fn with_require_path(mut self, root: impl Into<PathBuf>) -> Self {
        self.require_path = Some(root.into().clean());
        self
    }

    pub fn validate(&self) -> SandboxResult<()> {
        if self.output_initial_size == 0 {
            return Err(SandboxError::InvalidConfig(
                "output_initial_size must be greater than 0".to_string(),
            ));
        }
        if let Some(root) = &self.require_path {
            if !root.is_dir() {
                return Err(SandboxError::InvalidConfig(format!(
                    "require_path {} is not a directory",
                    root.display()
                )));
            }
        }
        Ok(())
    }

    /// Parse a JSON configuration document; missing fields take standard values
    pub fn from_json(text: &str) -> SandboxResult<Self> {
        serde_json::from_str(text).map_err(|e| SandboxError::InvalidConfig(e.to_string()))
    }
}
