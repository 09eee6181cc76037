/*!
 * JSON Table Encoding
 *
 * Writes a script table as a single JSON document. Shared and cyclic
 * sub-tables are emitted once; later references to a table already written
 * are dropped together with their key.
 */

use super::buffer::OutputBuffer;
use super::number::format_number;
use super::types::{OutputError, OutputResult};
use crate::core::limits::{MAX_JSON_DEPTH, TABLE_REF_INITIAL_CAPACITY};
use crate::engine::{Key, TableRef, Value};
use tracing::{trace, warn};

/// Path of the root table in the reference set
pub const ROOT_PATH: &str = "_";

/// A table written during the current pass
///
/// Paths are not stored; they are rebuilt from the parent chain on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRefEntry {
    pub id: usize,
    /// Index of the enclosing table's entry, `None` for the root
    pub parent: Option<usize>,
    /// Key under which the table was found, `None` for the root
    pub key: Option<Key>,
}

/// Tables already written during one encoding pass
#[derive(Debug)]
pub struct TableRefSet {
    refs: Vec<TableRefEntry>,
}

impl TableRefSet {
    pub fn with_capacity(capacity: usize) -> OutputResult<Self> {
        let mut refs = Vec::new();
        refs.try_reserve(capacity)
            .map_err(|_| OutputError::TableRefOutOfMemory)?;
        Ok(Self { refs })
    }

    /// Index of `table`'s entry, if it was already written
    pub fn find(&self, table: &TableRef) -> Option<usize> {
        let id = table.id();
        self.refs.iter().position(|entry| entry.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&TableRefEntry> {
        self.refs.get(index)
    }

    /// Record `table` as reached from `parent` through `key`; returns its index
    pub fn insert(
        &mut self,
        table: &TableRef,
        parent: Option<usize>,
        key: Option<Key>,
    ) -> OutputResult<usize> {
        if self.refs.len() == self.refs.capacity() {
            let additional = self.refs.capacity().max(1);
            self.refs
                .try_reserve(additional)
                .map_err(|_| OutputError::TableRefOutOfMemory)?;
        }
        self.refs.push(TableRefEntry {
            id: table.id(),
            parent,
            key,
        });
        Ok(self.refs.len() - 1)
    }

    /// Dotted path from the root, e.g. `_.config.limits`
    pub fn path(&self, index: usize) -> Option<String> {
        let mut keys = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let entry = self.refs.get(i)?;
            if let Some(key) = &entry.key {
                keys.push(key.to_string());
            }
            cursor = entry.parent;
        }
        let mut path = ROOT_PATH.to_string();
        for key in keys.iter().rev() {
            path.push('.');
            path.push_str(key);
        }
        Some(path)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Encode `table` as JSON into `output`
///
/// Nesting deeper than [`MAX_JSON_DEPTH`] tables fails the whole document.
pub fn encode_table(output: &mut OutputBuffer, table: &TableRef) -> OutputResult<()> {
    let mut refs = TableRefSet::with_capacity(TABLE_REF_INITIAL_CAPACITY)?;
    let root = refs.insert(table, None, None)?;
    encode_body(output, &mut refs, table, root, 1)
}

/// Keys exactly `1..=n`
fn is_array(entries: &[(Key, Value)]) -> bool {
    !entries.is_empty()
        && entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| *key == Key::Integer(i as i64 + 1))
}

/// Values with no JSON form, or tables already written
fn is_skipped(value: &Value, refs: &TableRefSet) -> bool {
    match value {
        Value::Nil | Value::Function(_) | Value::UserData(_) => true,
        Value::Table(t) => refs.find(t).is_some(),
        _ => false,
    }
}

fn encode_body(
    output: &mut OutputBuffer,
    refs: &mut TableRefSet,
    table: &TableRef,
    index: usize,
    depth: usize,
) -> OutputResult<()> {
    if depth > MAX_JSON_DEPTH {
        warn!(max_depth = MAX_JSON_DEPTH, "JSON table nesting too deep");
        return Err(OutputError::DepthExceeded {
            max_depth: MAX_JSON_DEPTH,
        });
    }

    let entries = table.entries();
    let array = is_array(&entries);
    output.append_char(if array { b'[' } else { b'{' })?;

    let mut first = true;
    for (key, value) in &entries {
        if !array && matches!(key, Key::Boolean(_)) {
            continue;
        }
        if is_skipped(value, refs) {
            trace!(path = ?refs.path(index), key = %key, "Skipping value in JSON encoding");
            continue;
        }
        if !first {
            output.append_char(b',')?;
        }
        first = false;

        if !array {
            encode_key(output, key)?;
            output.append_char(b':')?;
        }
        match value {
            Value::Table(child) => {
                let child_index = refs.insert(child, Some(index), Some(key.clone()))?;
                encode_body(output, refs, child, child_index, depth + 1)?;
            }
            scalar => encode_scalar(output, scalar)?,
        }
    }

    output.append_char(if array { b']' } else { b'}' })
}

fn encode_key(output: &mut OutputBuffer, key: &Key) -> OutputResult<()> {
    match key {
        Key::String(s) => encode_string(output, s),
        Key::Integer(i) => output.append_fmt(format_args!("\"{}\"", i)),
        Key::Float(bits) => output.append_fmt(format_args!("\"{}\"", format_number(f64::from_bits(*bits)))),
        Key::Boolean(_) => Ok(()),
    }
}

fn encode_scalar(output: &mut OutputBuffer, value: &Value) -> OutputResult<()> {
    match value {
        Value::Boolean(b) => output.append_str(if *b { "true" } else { "false" }),
        Value::Number(n) if n.is_finite() => output.append_str(&format_number(*n)),
        Value::String(s) => encode_string(output, s),
        _ => output.append_str("null"),
    }
}

/// Quote and escape a script string
///
/// Valid UTF-8 runs are escaped by `serde_json`. A byte that is not part of a
/// valid sequence is written as `\u00XX`, so its value survives and the
/// document stays valid JSON.
fn encode_string(output: &mut OutputBuffer, bytes: &[u8]) -> OutputResult<()> {
    output.append_char(b'"')?;
    let mut rest = bytes;
    while !rest.is_empty() {
        let (valid, invalid) = match std::str::from_utf8(rest) {
            Ok(text) => (text, 0),
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                let invalid = err.error_len().unwrap_or(rest.len() - valid_up_to);
                let text = std::str::from_utf8(&rest[..valid_up_to])
                    .map_err(|e| OutputError::Encoding(e.to_string()))?;
                (text, invalid)
            }
        };
        if !valid.is_empty() {
            let quoted =
                serde_json::to_string(valid).map_err(|e| OutputError::Encoding(e.to_string()))?;
            output.append_str(&quoted[1..quoted.len() - 1])?;
        }
        let consumed = valid.len();
        for byte in &rest[consumed..consumed + invalid] {
            output.append_fmt(format_args!("\\u{:04x}", byte))?;
        }
        rest = &rest[consumed + invalid..];
    }
    output.append_char(b'"')
}
