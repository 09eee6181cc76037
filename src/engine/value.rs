/*!
 * Script Values
 *
 * Host-side view of the engine's dynamically typed values. Tables are shared,
 * identity-comparable handles so shared and cyclic structure can be expressed.
 */

use bytes::Bytes;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque native object exposed to scripts (ring buffers, probabilistic sets, ...)
pub trait NativeObject: Send + Sync + fmt::Debug {
    /// Type tag used to find the object's output encoder
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Named native function handle
#[derive(Clone, PartialEq, Eq)]
pub struct Function {
    name: Arc<str>,
}

impl Function {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function: {}", self.name)
    }
}

/// Script value
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Bytes),
    Table(TableRef),
    Function(Function),
    UserData(Arc<dyn NativeObject>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::UserData(_) => "userdata",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }
}

/// Tables and userdata compare by identity, everything else by value
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::UserData(a), Value::UserData(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const u8, Arc::as_ptr(b) as *const u8)
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Bytes::from(s))
    }
}

impl From<TableRef> for Value {
    fn from(t: TableRef) -> Self {
        Value::Table(t)
    }
}

/// Table key
///
/// Integral numbers normalize to `Integer`; NaN and nil are not valid keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Integer(i64),
    /// Non-integral number, stored as raw bits
    Float(u64),
    String(Bytes),
    Boolean(bool),
}

impl Key {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Some(Key::Integer(*n as i64)),
            Value::Number(n) => Some(Key::Float(n.to_bits())),
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Boolean(b) => Some(Key::Boolean(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(i) => write!(f, "{}", i),
            Key::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Key::String(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Key::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Integer(i)
    }
}

/// Marks tables the sandbox controls, as opposed to script-created data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableTag {
    /// Built-in library or externally loaded module
    Library,
}

/// Table storage
#[derive(Debug, Default)]
pub struct Table {
    entries: BTreeMap<Key, Value>,
    tag: Option<TableTag>,
}

/// Shared handle to a table
#[derive(Clone, Default)]
pub struct TableRef(Arc<Mutex<Table>>);

impl TableRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the underlying table
    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, key: &Key) -> Value {
        self.0.lock().entries.get(key).cloned().unwrap_or(Value::Nil)
    }

    /// Assigning nil removes the key
    pub fn set(&self, key: Key, value: Value) {
        let mut table = self.0.lock();
        if value.is_nil() {
            table.entries.remove(&key);
        } else {
            table.entries.insert(key, value);
        }
    }

    pub fn remove(&self, key: &Key) -> Value {
        self.0.lock().entries.remove(key).unwrap_or(Value::Nil)
    }

    pub fn get_field(&self, name: &str) -> Value {
        self.get(&Key::from(name))
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.set(Key::from(name), value)
    }

    pub fn remove_field(&self, name: &str) -> Value {
        self.remove(&Key::from(name))
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.0.lock().entries.contains_key(&Key::from(name))
    }

    /// Append at index `len + 1`
    pub fn push(&self, value: Value) {
        let next = self.len() as i64 + 1;
        self.set(Key::Integer(next), value);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().entries.is_empty()
    }

    /// Snapshot of the entries in key order
    ///
    /// Taken under the lock and released before returning, so callers may
    /// recurse into nested tables (including this one) freely.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.0
            .lock()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().entries.clear();
    }

    pub fn tag(&self) -> Option<TableTag> {
        self.0.lock().tag
    }

    pub fn set_tag(&self, tag: TableTag) {
        self.0.lock().tag = Some(tag);
    }

    pub fn is_library(&self) -> bool {
        self.tag() == Some(TableTag::Library)
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never recurse: tables may be cyclic
        write!(f, "table: 0x{:x}", self.id())
    }
}

impl FromIterator<(Key, Value)> for TableRef {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let table = TableRef::new();
        for (k, v) in iter {
            table.set(k, v);
        }
        table
    }
}
