/*!
 * Native Object Encoders
 * Output encoders for userdata, keyed by the object's type name
 */

use super::buffer::OutputBuffer;
use super::types::OutputResult;
use crate::engine::NativeObject;
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;

/// Writes a native object's serialized form into the buffer
pub type NativeEncoder = fn(&dyn NativeObject, &mut OutputBuffer) -> OutputResult<()>;

#[derive(Clone, Default)]
pub struct EncoderRegistry {
    encoders: HashMap<String, NativeEncoder, RandomState>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the encoder for `type_name`
    pub fn register(&mut self, type_name: &str, encoder: NativeEncoder) -> Option<NativeEncoder> {
        self.encoders.insert(type_name.to_string(), encoder)
    }

    pub fn get(&self, type_name: &str) -> Option<NativeEncoder> {
        self.encoders.get(type_name).copied()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.encoders.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.encoders.keys()).finish()
    }
}
