/// Serde helper functions for sandbox configuration and stats
use serde::{Deserialize, Deserializer, Serializer};
use std::path::PathBuf;

/// Skip serializing if Option is None
pub fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}

/// Serialize Option<PathBuf> as Option<String>
pub mod optional_pathbuf_string {
    use super::*;

    pub fn serialize<S>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(p) => serializer.serialize_some(&p.to_string_lossy().to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(opt.map(PathBuf::from))
    }
}
