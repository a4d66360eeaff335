//! Storage codec - CommandStore <-> bytes
//!
//! Stores are tab-indented JSON so they can be inspected (and consumed by other
//! tools) directly. Payload bytes are kept as standard base64 strings.

use serde::ser::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::core::model::CommandStore;

/// Encode a store into its on-disk representation
pub fn encode(store: &CommandStore) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    store.serialize(&mut ser)?;
    Ok(buf)
}

/// Decode a store; any structural problem is reported as an error
pub fn decode(bytes: &[u8]) -> serde_json::Result<CommandStore> {
    serde_json::from_slice(bytes)
}

/// `#[serde(with = ...)]` adapter for raw byte payloads
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
