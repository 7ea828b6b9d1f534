//! Message identity values and the hashing helpers behind envelope equality.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Correlation key pairing a response with its request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random request id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque token used to follow one logical event across log lines and hops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTrackingId(String);

impl EventTrackingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventTrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Networking node a message is addressed to. Stored and echoed, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    pub fn new(node: impl Into<String>) -> Self {
        Self(node.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Destination {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

impl From<String> for Destination {
    fn from(node: String) -> Self {
        Self(node)
    }
}

/// Ordered list of networking nodes a message travelled through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkPath(Vec<String>);

impl NetworkPath {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_hops<I, S>(hops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(hops.into_iter().map(Into::into).collect())
    }

    /// Returns a new path with `hop` appended.
    pub fn append(&self, hop: impl Into<String>) -> Self {
        let mut hops = self.0.clone();
        hops.push(hop.into());
        Self(hops)
    }

    /// The path a reply takes back to the origin.
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().cloned().collect())
    }

    pub fn origin(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn hops(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

/// Serialization format tag carried along with a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    /// JSON text frames.
    #[default]
    Json,
    /// UTF-8 encoded JSON carried in binary frames.
    JsonUtf8Binary,
}

impl std::str::FromStr for SerializationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SerializationFormat::Json),
            "json_utf8_binary" | "jsonutf8binary" => Ok(SerializationFormat::JsonUtf8Binary),
            other => Err(format!("unknown serialization format '{}'", other)),
        }
    }
}

/// Hashes a single field value.
pub fn field_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Combines field hashes, each weighted by its own small prime so that
/// permutations of equal-valued fields do not collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashCombiner {
    state: u64,
}

impl HashCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: Hash + ?Sized>(self, prime: u64, value: &T) -> Self {
        self.raw(prime, field_hash(value))
    }

    /// Absent optional fields contribute nothing.
    pub fn optional<T: Hash>(self, prime: u64, value: Option<&T>) -> Self {
        match value {
            Some(v) => self.field(prime, v),
            None => self,
        }
    }

    pub fn json(self, prime: u64, value: &Value) -> Self {
        self.raw(prime, json_hash(value))
    }

    pub fn raw(self, prime: u64, hash: u64) -> Self {
        Self {
            state: self.state ^ hash.wrapping_mul(prime),
        }
    }

    pub fn finish(self) -> u64 {
        self.state
    }
}

/// Hashes a JSON value consistently with `Value` equality: object keys are
/// visited in sorted order, so equal objects hash alike regardless of the
/// order their keys were inserted in.
pub fn json_hash(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_json_into(value, &mut hasher);
    hasher.finish()
}

fn hash_json_into<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            if let Some(i) = n.as_i64() {
                0u8.hash(state);
                i.hash(state);
            } else if let Some(u) = n.as_u64() {
                1u8.hash(state);
                u.hash(state);
            } else {
                let f = n.as_f64().unwrap_or_default();
                // 0.0 and -0.0 compare equal
                let f = if f == 0.0 { 0.0 } else { f };
                2u8.hash(state);
                f.to_bits().hash(state);
            }
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_json_into(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            map.len().hash(state);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(state);
                hash_json_into(&map[key], state);
            }
        }
    }
}
