//! Cryptographic signature records attached to messages.

use crate::codec::{FieldReader, FieldWriter};
use crate::custom_data::{CustomData, CustomSerializer};
use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single signature over a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Reference to (or encoding of) the public key that produced the signature.
    pub key_id: String,
    /// The encoded signature value.
    pub value: String,
    pub signing_method: Option<String>,
    pub encoding_method: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub custom_data: Option<CustomData>,
}

impl Signature {
    pub fn new(key_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            value: value.into(),
            signing_method: None,
            encoding_method: None,
            name: None,
            description: None,
            timestamp: None,
            custom_data: None,
        }
    }

    pub fn with_methods(
        mut self,
        signing_method: impl Into<String>,
        encoding_method: impl Into<String>,
    ) -> Self {
        self.signing_method = Some(signing_method.into());
        self.encoding_method = Some(encoding_method.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    pub fn try_parse(json: &Value) -> Result<Self, ParseError> {
        let fields = FieldReader::from_value(json)?;
        Ok(Self {
            key_id: fields.mandatory("keyId")?,
            value: fields.mandatory("value")?,
            signing_method: fields.optional("signingMethod")?,
            encoding_method: fields.optional("encodingMethod")?,
            name: fields.optional("name")?,
            description: fields.optional("description")?,
            timestamp: fields.optional("timestamp")?,
            custom_data: fields.custom_data()?,
        })
    }

    pub fn to_json(
        &self,
        custom: Option<&CustomSerializer<Signature>>,
        custom_data: Option<&CustomSerializer<CustomData>>,
    ) -> Value {
        let mut writer = FieldWriter::new();
        writer
            .put("keyId", &self.key_id)
            .put("value", &self.value)
            .put_optional("signingMethod", self.signing_method.as_ref())
            .put_optional("encodingMethod", self.encoding_method.as_ref())
            .put_optional("name", self.name.as_ref())
            .put_optional("description", self.description.as_ref())
            .put_optional("timestamp", self.timestamp.as_ref());
        if let Some(data) = &self.custom_data {
            writer.put_json("customData", data.to_json(custom_data));
        }
        let object = writer.finish();
        match custom {
            Some(hook) => Value::Object(hook(self, object)),
            None => Value::Object(object),
        }
    }
}

/// The signatures of one message.
///
/// Behaves as a set: duplicates are dropped on insert and equality ignores
/// order. Insertion order is kept for serialization.
#[derive(Debug, Clone, Default, Eq)]
pub struct Signatures(Vec<Signature>);

impl Signatures {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a signature; returns `false` if it was already present.
    pub fn insert(&mut self, signature: Signature) -> bool {
        if self.0.contains(&signature) {
            return false;
        }
        self.0.push(signature);
        true
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.0.contains(signature)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the set, or returns `None` when it is empty so that the
    /// `signatures` key can be omitted.
    pub fn to_json(
        &self,
        custom: Option<&CustomSerializer<Signature>>,
        custom_data: Option<&CustomSerializer<CustomData>>,
    ) -> Option<Value> {
        if self.0.is_empty() {
            return None;
        }
        Some(Value::Array(
            self.0
                .iter()
                .map(|signature| signature.to_json(custom, custom_data))
                .collect(),
        ))
    }
}

impl PartialEq for Signatures {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|s| other.0.contains(s))
    }
}

impl FromIterator<Signature> for Signatures {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        let mut set = Signatures::new();
        for signature in iter {
            set.insert(signature);
        }
        set
    }
}

impl Extend<Signature> for Signatures {
    fn extend<I: IntoIterator<Item = Signature>>(&mut self, iter: I) {
        for signature in iter {
            self.insert(signature);
        }
    }
}

impl<'a> IntoIterator for &'a Signatures {
    type Item = &'a Signature;
    type IntoIter = std::slice::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
