/*!
 * Output Types
 */

use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output operation result
pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum OutputError {
    /// Growing would push the buffer past its ceiling
    #[error("output_limit exceeded")]
    #[diagnostic(
        code(output::limit_exceeded),
        help("The call emitted more output than the configured ceiling allows.")
    )]
    LimitExceeded { needed: Size, limit: Size },

    #[error("output_limit exceeded: out of memory growing buffer to {requested} bytes")]
    #[diagnostic(code(output::out_of_memory))]
    OutOfMemory { requested: Size },

    #[error("json table serialization out of memory")]
    #[diagnostic(code(output::table_ref_out_of_memory))]
    TableRefOutOfMemory,

    #[error("json table serialization depth exceeded")]
    #[diagnostic(
        code(output::depth_exceeded),
        help("Tables nested deeper than the encoder allows cannot be emitted.")
    )]
    DepthExceeded { max_depth: Size },

    #[error("json encoding failed: {0}")]
    #[diagnostic(code(output::encoding))]
    Encoding(String),

    #[error("output() must have at least one argument")]
    #[diagnostic(
        code(output::no_arguments),
        help("Pass one or more values to output().")
    )]
    NoArguments,
}
