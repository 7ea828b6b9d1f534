//! Field codec: typed extraction of mandatory and optional JSON fields.
//!
//! `FieldReader` turns a loosely-typed JSON object into typed values or a
//! [`ParseError`] naming the field. Mandatory fields fail when absent;
//! optional fields may be absent but never malformed. An explicit `null`
//! is rejected in both modes, since absence and null are distinct on the
//! wire.

use crate::custom_data::{json_type_name, CustomData};
use crate::error::ParseError;
use crate::signature::{Signature, Signatures};
use crate::JsonObject;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Reads typed fields out of a JSON object.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    object: &'a JsonObject,
}

impl<'a> FieldReader<'a> {
    pub fn new(object: &'a JsonObject) -> Self {
        Self { object }
    }

    /// Wraps a JSON value that must be an object.
    pub fn from_value(value: &'a Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(object) => Ok(Self::new(object)),
            other => Err(ParseError::malformed(
                "$",
                format!("expected a JSON object, got {}", json_type_name(other)),
            )),
        }
    }

    pub fn object(&self) -> &'a JsonObject {
        self.object
    }

    pub fn contains(&self, field: &str) -> bool {
        self.object.contains_key(field)
    }

    /// Extracts a mandatory field of any deserializable type.
    pub fn mandatory<T: DeserializeOwned>(&self, field: &str) -> Result<T, ParseError> {
        self.mandatory_with(field, deserialize)
    }

    /// Extracts an optional field of any deserializable type.
    pub fn optional<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, ParseError> {
        self.optional_with(field, deserialize)
    }

    /// Extracts a mandatory field through a custom parser.
    pub fn mandatory_with<T, F>(&self, field: &str, parser: F) -> Result<T, ParseError>
    where
        F: FnOnce(&Value) -> Result<T, String>,
    {
        match self.optional_with(field, parser)? {
            Some(value) => Ok(value),
            None => Err(ParseError::missing(field)),
        }
    }

    /// Extracts an optional field through a custom parser.
    pub fn optional_with<T, F>(&self, field: &str, parser: F) -> Result<Option<T>, ParseError>
    where
        F: FnOnce(&Value) -> Result<T, String>,
    {
        match self.object.get(field) {
            None => Ok(None),
            Some(Value::Null) => Err(ParseError::malformed(field, "null is not a valid value")),
            Some(value) => parser(value)
                .map(Some)
                .map_err(|reason| ParseError::malformed(field, reason)),
        }
    }

    /// Extracts a mandatory string and checks its length in characters.
    pub fn bounded_string(&self, field: &str, max_len: usize) -> Result<String, ParseError> {
        self.mandatory_with(field, |value| parse_bounded_string(value, max_len))
    }

    pub fn optional_bounded_string(
        &self,
        field: &str,
        max_len: usize,
    ) -> Result<Option<String>, ParseError> {
        self.optional_with(field, |value| parse_bounded_string(value, max_len))
    }

    /// Extracts a mandatory array, parsing each element with `element`.
    ///
    /// The first failing element fails the whole field.
    pub fn mandatory_array<T, F>(&self, field: &str, element: F) -> Result<Vec<T>, ParseError>
    where
        F: Fn(&Value) -> Result<T, String>,
    {
        match self.optional_array(field, element)? {
            Some(items) => Ok(items),
            None => Err(ParseError::missing(field)),
        }
    }

    pub fn optional_array<T, F>(&self, field: &str, element: F) -> Result<Option<Vec<T>>, ParseError>
    where
        F: Fn(&Value) -> Result<T, String>,
    {
        match self.object.get(field) {
            None => Ok(None),
            Some(value) => parse_elements(value, &element)
                .map(Some)
                .map_err(|(index, reason)| match index {
                    Some(i) => ParseError::malformed(format!("{}[{}]", field, i), reason),
                    None => ParseError::malformed(field, reason),
                }),
        }
    }

    /// Reads the optional `signatures` block.
    pub fn signatures(&self) -> Result<Signatures, ParseError> {
        match self.object.get("signatures") {
            None => Ok(Signatures::new()),
            Some(value) => {
                let items = parse_elements(value, &|item| {
                    Signature::try_parse(item).map_err(|e| e.to_string())
                })
                .map_err(|(index, reason)| match index {
                    Some(index) => ParseError::SignatureInvalid { index, reason },
                    None => ParseError::malformed("signatures", reason),
                })?;
                Ok(items.into_iter().collect())
            }
        }
    }

    /// Reads the optional `customData` block.
    pub fn custom_data(&self) -> Result<Option<CustomData>, ParseError> {
        match self.object.get("customData") {
            None => Ok(None),
            Some(value) => CustomData::try_parse(value).map(Some),
        }
    }
}

fn deserialize<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    T::deserialize(value).map_err(|e| e.to_string())
}

fn parse_bounded_string(value: &Value, max_len: usize) -> Result<String, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", json_type_name(value)))?;
    let len = s.chars().count();
    if len > max_len {
        return Err(format!("{} characters exceeds the maximum of {}", len, max_len));
    }
    Ok(s.to_string())
}

/// Parses every element of a JSON array; on failure returns the failing
/// index (`None` when the value is not an array at all) and the reason.
fn parse_elements<T, F>(value: &Value, element: &F) -> Result<Vec<T>, (Option<usize>, String)>
where
    F: Fn(&Value) -> Result<T, String>,
{
    let items = value.as_array().ok_or_else(|| {
        (
            None,
            format!("expected an array, got {}", json_type_name(value)),
        )
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| element(item).map_err(|reason| (Some(i), reason)))
        .collect()
}

/// Builds a JSON object field by field, in insertion order.
#[derive(Debug, Default)]
pub struct FieldWriter {
    object: JsonObject,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize + ?Sized>(&mut self, field: &str, value: &T) -> &mut Self {
        // Values reaching here are plain data types whose serialization cannot fail
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.object.insert(field.to_string(), value);
        self
    }

    pub fn put_optional<T: Serialize>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        if let Some(value) = value {
            self.put(field, value);
        }
        self
    }

    pub fn put_json(&mut self, field: &str, value: Value) -> &mut Self {
        self.object.insert(field.to_string(), value);
        self
    }

    pub fn finish(self) -> JsonObject {
        self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;
    use serde_json::json;

    fn reader(value: &Value) -> FieldReader<'_> {
        FieldReader::from_value(value).unwrap()
    }

    #[test]
    fn test_mandatory_present_and_missing() {
        let json = json!({"evseId": 3});
        let r = reader(&json);
        assert_eq!(r.mandatory::<u32>("evseId").unwrap(), 3);

        let err = r.mandatory::<u32>("timeout").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::FieldMissing);
        assert_eq!(err.field(), Some("timeout"));
    }

    #[test]
    fn test_type_mismatch_is_malformed() {
        let json = json!({"evseId": "three"});
        let err = reader(&json).mandatory::<u32>("evseId").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::FieldMalformed);
        assert_eq!(err.field(), Some("evseId"));
    }

    #[test]
    fn test_optional_absent_present_invalid() {
        let json = json!({"ongoing": true, "broken": 12});
        let r = reader(&json);
        assert_eq!(r.optional::<bool>("missing").unwrap(), None);
        assert_eq!(r.optional::<bool>("ongoing").unwrap(), Some(true));

        // optional means "may be missing", not "may be malformed"
        let err = r.optional::<bool>("broken").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::FieldMalformed);
    }

    #[test]
    fn test_null_is_rejected() {
        let json = json!({"transactionId": null});
        let r = reader(&json);
        assert_eq!(
            r.optional::<String>("transactionId").unwrap_err().kind(),
            ParseErrorKind::FieldMalformed
        );
        assert_eq!(
            r.mandatory::<String>("transactionId").unwrap_err().kind(),
            ParseErrorKind::FieldMalformed
        );
    }

    #[test]
    fn test_custom_parser_rejection() {
        let json = json!({"timeout": -5});
        let err = reader(&json)
            .mandatory_with("timeout", |v| {
                v.as_u64().ok_or_else(|| "must be a non-negative integer".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_bounded_string() {
        let json = json!({"id": "abcdef"});
        let r = reader(&json);
        assert_eq!(r.bounded_string("id", 6).unwrap(), "abcdef");
        let err = r.bounded_string("id", 5).unwrap_err();
        assert!(err.to_string().contains("maximum of 5"));
        assert_eq!(r.optional_bounded_string("other", 5).unwrap(), None);
    }

    #[test]
    fn test_array_element_failure_fails_field() {
        let json = json!({"values": [1, 2, "x", 4]});
        let err = reader(&json)
            .mandatory_array("values", |v| v.as_u64().ok_or_else(|| "not a number".to_string()))
            .unwrap_err();
        assert_eq!(err.field(), Some("values[2]"));

        let json = json!({"values": {"a": 1}});
        let err = reader(&json)
            .mandatory_array("values", |v| Ok(v.clone()))
            .unwrap_err();
        assert_eq!(err.field(), Some("values"));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_signatures_block() {
        let json = json!({});
        assert!(reader(&json).signatures().unwrap().is_empty());

        let json = json!({"signatures": [{"keyId": "k1", "value": "aa"}, {"value": "bb"}]});
        let err = reader(&json).signatures().unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::SignatureInvalid);
        assert!(matches!(err, ParseError::SignatureInvalid { index: 1, .. }));
        assert!(err.to_string().contains("keyId"));
    }

    #[test]
    fn test_signatures_not_an_array() {
        let json = json!({"signatures": {"keyId": "k1", "value": "aa"}});
        let err = reader(&json).signatures().unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::FieldMalformed);
        assert_eq!(err.field(), Some("signatures"));
        assert!(err.to_string().contains("expected an array"));
    }

    #[test]
    fn test_custom_data_block() {
        let json = json!({"customData": {"vendorId": "acme"}});
        assert_eq!(
            reader(&json).custom_data().unwrap().unwrap().vendor_id(),
            "acme"
        );

        let json = json!({"customData": {}});
        assert_eq!(
            reader(&json).custom_data().unwrap_err().kind(),
            ParseErrorKind::ExtensionDataInvalid
        );
    }

    #[test]
    fn test_not_an_object() {
        let json = json!([1, 2]);
        let err = FieldReader::from_value(&json).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_writer_keeps_insertion_order() {
        let mut writer = FieldWriter::new();
        writer
            .put("zeta", &1)
            .put_optional::<String>("skipped", None)
            .put("alpha", "a");
        let text = serde_json::to_string(&writer.finish()).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":"a"}"#);
    }
}
