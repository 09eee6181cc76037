/*!
 * Output Module
 * Output buffer and the value encoders that write into it
 */

pub mod buffer;
pub mod dispatcher;
pub mod encoders;
pub mod json;
pub mod number;
pub mod types;

pub use buffer::OutputBuffer;
pub use dispatcher::emit;
pub use encoders::{EncoderRegistry, NativeEncoder};
pub use json::{encode_table, TableRefEntry, TableRefSet};
pub use number::{append_number, format_number};
pub use types::*;
