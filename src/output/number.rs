/*!
 * Number Encoding
 * Compact textual form for numbers written to the output buffer
 */

use super::buffer::OutputBuffer;
use super::types::OutputResult;

/// Largest magnitude below which every integral f64 is exact
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Magnitude past which integral values switch to exponent form
const EXPONENT_THRESHOLD: f64 = 1e17;

/// Render a number the way scripts expect to see it
///
/// - integral values in (-2^53, 2^53) print without a decimal point
/// - other finite values print up to 8 fractional digits, trailing zeros trimmed
/// - non-integral values beyond `i32::MAX` use the shortest round-trip form
/// - `nan`, `inf`, `-inf`
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if value.fract() == 0.0 {
        if magnitude < EXACT_INTEGER_LIMIT {
            return format!("{}", value as i64);
        }
        if magnitude >= EXPONENT_THRESHOLD {
            return format!("{:e}", value);
        }
        return format!("{}", value);
    }
    if magnitude > i32::MAX as f64 {
        return format!("{}", value);
    }

    let mut text = format!("{:.8}", value);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
    text.truncate(trimmed);
    if text == "-0" {
        text.remove(0);
    }
    text
}

/// Append a number to the buffer
pub fn append_number(output: &mut OutputBuffer, value: f64) -> OutputResult<()> {
    output.append_str(&format_number(value))
}
