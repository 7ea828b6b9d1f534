//! Vendor-specific extension data (`customData`).

use crate::error::ParseError;
use crate::identity::{field_hash, json_hash};
use crate::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};

/// Maximum length of a vendor id.
pub const MAX_VENDOR_ID_LEN: usize = 255;

/// Hook rewriting the serialized form of a value.
pub type CustomSerializer<T> = dyn Fn(&T, JsonObject) -> JsonObject + Send + Sync;

/// Open, vendor-namespaced data attached to a message or a value type.
///
/// Only `vendorId` is validated; every other key is kept as-is so that a
/// parse/serialize cycle reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JsonObject", into = "JsonObject")]
pub struct CustomData {
    vendor_id: String,
    extra: JsonObject,
}

impl CustomData {
    pub fn new(vendor_id: impl Into<String>) -> Result<Self, ParseError> {
        let vendor_id = vendor_id.into();
        validate_vendor_id(&vendor_id)?;
        Ok(Self {
            vendor_id,
            extra: JsonObject::new(),
        })
    }

    /// Adds a vendor field. `vendorId` itself cannot be overwritten.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "vendorId" {
            self.extra.insert(key, value.into());
        }
        self
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn fields(&self) -> &JsonObject {
        &self.extra
    }

    /// Parses a `customData` JSON object.
    pub fn try_parse(json: &Value) -> Result<Self, ParseError> {
        match json {
            Value::Object(object) => Self::try_from(object.clone()),
            other => Err(ParseError::ExtensionDataInvalid {
                reason: format!("expected a JSON object, got {}", json_type_name(other)),
            }),
        }
    }

    pub(crate) fn hash_code(&self) -> u64 {
        field_hash(self)
    }

    pub fn to_json(&self, custom: Option<&CustomSerializer<CustomData>>) -> Value {
        let object = JsonObject::from(self.clone());
        match custom {
            Some(hook) => Value::Object(hook(self, object)),
            None => Value::Object(object),
        }
    }
}

impl Hash for CustomData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vendor_id.hash(state);
        json_hash(&Value::Object(self.extra.clone())).hash(state);
    }
}

impl TryFrom<JsonObject> for CustomData {
    type Error = ParseError;

    fn try_from(mut object: JsonObject) -> Result<Self, Self::Error> {
        let vendor_id = match object.shift_remove("vendorId") {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(ParseError::ExtensionDataInvalid {
                    reason: format!(
                        "vendorId must be a string, got {}",
                        json_type_name(&other)
                    ),
                })
            }
            None => {
                return Err(ParseError::ExtensionDataInvalid {
                    reason: "missing mandatory field 'vendorId'".to_string(),
                })
            }
        };
        validate_vendor_id(&vendor_id)?;
        Ok(Self {
            vendor_id,
            extra: object,
        })
    }
}

impl From<CustomData> for JsonObject {
    fn from(data: CustomData) -> Self {
        let mut object = JsonObject::new();
        object.insert("vendorId".to_string(), Value::String(data.vendor_id));
        object.extend(data.extra);
        object
    }
}

fn validate_vendor_id(vendor_id: &str) -> Result<(), ParseError> {
    if vendor_id.is_empty() {
        return Err(ParseError::ExtensionDataInvalid {
            reason: "vendorId must not be empty".to_string(),
        });
    }
    let len = vendor_id.chars().count();
    if len > MAX_VENDOR_ID_LEN {
        return Err(ParseError::ExtensionDataInvalid {
            reason: format!(
                "vendorId is {} characters long (max {})",
                len, MAX_VENDOR_ID_LEN
            ),
        });
    }
    Ok(())
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
