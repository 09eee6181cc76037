/*!
 * Sandbox Limits and Constants
 *
 * Centralized location for sandbox-wide limits, thresholds, and magic numbers.
 * Organized by subsystem.
 *
 * - Security-critical constants are marked with [SECURITY]
 * - Values mirroring the embedded engine's conventions are marked with [ENGINE-COMPAT]
 */

// =============================================================================
// MEMORY
// =============================================================================

/// Alignment used for every block handed to the engine
/// [ENGINE-COMPAT] Matches the strictest fundamental alignment on 64-bit targets
pub const ALLOCATION_ALIGNMENT: usize = 16;

/// Standard memory ceiling (8MB)
pub const STANDARD_MEMORY_LIMIT: usize = 8 * 1024 * 1024;

/// Minimal memory ceiling (1MB)
/// For untrusted, short-lived scripts
pub const MINIMAL_MEMORY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// Standard per-call instruction budget
pub const STANDARD_INSTRUCTION_LIMIT: u32 = 1_000_000;

/// Minimal per-call instruction budget
pub const MINIMAL_INSTRUCTION_LIMIT: u32 = 10_000;

// =============================================================================
// OUTPUT
// =============================================================================

/// Default initial output buffer size (1KB)
pub const DEFAULT_OUTPUT_SIZE: usize = 1024;

/// Standard output ceiling (64KB)
pub const STANDARD_OUTPUT_LIMIT: usize = 64 * 1024;

/// Minimal output ceiling (4KB)
pub const MINIMAL_OUTPUT_LIMIT: usize = 4 * 1024;

/// Initial capacity of the table reference set used by JSON encoding
pub const TABLE_REF_INITIAL_CAPACITY: usize = 64;

/// Deepest table nesting JSON encoding will follow
/// [SECURITY] Encoding recurses per level; bounds host stack use
/// [ENGINE-COMPAT] Same default as the engine's cjson `encode_max_depth`
pub const MAX_JSON_DEPTH: usize = 1000;

// =============================================================================
// ERRORS
// =============================================================================

/// Size of the last-error slot in bytes, terminator included
/// Messages are truncated to `ERROR_MESSAGE_SIZE - 1` bytes
pub const ERROR_MESSAGE_SIZE: usize = 256;

// =============================================================================
// MODULE LOADING
// =============================================================================

/// Maximum composed module path length, terminator included
/// [SECURITY] Bounds the path built from an untrusted module name
pub const MAX_MODULE_PATH: usize = 255;

/// File extension of external script modules
pub const MODULE_EXTENSION: &str = "lua";

/// Global table that holds the loader state
pub const PACKAGE_TABLE: &str = "package";

/// Field of the package table that holds the module cache
pub const LOADED_TABLE: &str = "loaded";
