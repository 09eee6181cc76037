/*!
 * Value Emission Dispatcher
 *
 * Implements the script-facing `output(...)`: each argument is written to the
 * output buffer according to its type. The first failing argument aborts the
 * whole emission; arguments before it stay written.
 */

use super::buffer::OutputBuffer;
use super::encoders::EncoderRegistry;
use super::json::encode_table;
use super::number::append_number;
use super::types::{OutputError, OutputResult};
use crate::engine::Value;
use tracing::trace;

/// Write every argument to `output`
pub fn emit(output: &mut OutputBuffer, encoders: &EncoderRegistry, args: &[Value]) -> OutputResult<()> {
    if args.is_empty() {
        return Err(OutputError::NoArguments);
    }
    for value in args {
        emit_value(output, encoders, value)?;
    }
    Ok(())
}

fn emit_value(output: &mut OutputBuffer, encoders: &EncoderRegistry, value: &Value) -> OutputResult<()> {
    match value {
        Value::Number(n) => append_number(output, *n),
        Value::String(s) => output.append_bytes(s),
        Value::Nil => output.append_str("nil"),
        Value::Boolean(b) => output.append_str(if *b { "true" } else { "false" }),
        Value::Table(t) => {
            encode_table(output, t)?;
            output.append_char(b'\n')
        }
        Value::UserData(object) => match encoders.get(object.type_name()) {
            Some(encode) => encode(object.as_ref(), output),
            None => {
                trace!(type_name = object.type_name(), "No encoder registered, skipping");
                Ok(())
            }
        },
        Value::Function(f) => {
            trace!(function = f.name(), "Functions are not emitted");
            Ok(())
        }
    }
}
