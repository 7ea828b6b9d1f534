//! OCPP-J RPC framing.
//!
//! Every message on the wire is a JSON array whose first element is the
//! message type:
//!
//! ```text
//! CALL        [2, "<messageId>", "<action>", {payload}]
//! CALLRESULT  [3, "<messageId>", {payload}]
//! CALLERROR   [4, "<messageId>", "<errorCode>", "<errorDescription>", {errorDetails}]
//! ```

use crate::error::{ProtocolError, RpcErrorCode};
use serde_json::{json, Value};

/// Message type number of a CALL frame.
pub const CALL: u64 = 2;
/// Message type number of a CALLRESULT frame.
pub const CALL_RESULT: u64 = 3;
/// Message type number of a CALLERROR frame.
pub const CALL_ERROR: u64 = 4;

/// Maximum length of a message id on the wire.
pub const MAX_MESSAGE_ID_LEN: usize = 36;

/// A decoded OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcFrame {
    Call {
        message_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        message_id: String,
        payload: Value,
    },
    CallError {
        message_id: String,
        error_code: RpcErrorCode,
        description: String,
        details: Value,
    },
}

impl RpcFrame {
    /// Decodes a frame from its text form.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Decodes a frame from an already parsed JSON array.
    pub fn from_json(value: &Value) -> Result<Self, ProtocolError> {
        let elements = value
            .as_array()
            .ok_or_else(|| ProtocolError::InvalidFrame("frame is not a JSON array".to_string()))?;

        let message_type = elements
            .first()
            .ok_or(ProtocolError::MissingField("messageTypeId"))?
            .as_u64()
            .ok_or_else(|| {
                ProtocolError::InvalidFrame("messageTypeId is not an unsigned integer".to_string())
            })?;

        let expected_len = match message_type {
            CALL => 4,
            CALL_RESULT => 3,
            CALL_ERROR => 5,
            other => return Err(ProtocolError::UnknownMessageType(other)),
        };
        if elements.len() != expected_len {
            return Err(ProtocolError::InvalidFrame(format!(
                "message type {} expects {} elements, got {}",
                message_type,
                expected_len,
                elements.len()
            )));
        }

        let message_id = string_at(elements, 1, "messageId")?;
        if message_id.is_empty() || message_id.chars().count() > MAX_MESSAGE_ID_LEN {
            return Err(ProtocolError::InvalidFrame(format!(
                "messageId must be 1 to {} characters",
                MAX_MESSAGE_ID_LEN
            )));
        }

        let frame = match message_type {
            CALL => RpcFrame::Call {
                message_id,
                action: string_at(elements, 2, "action")?,
                payload: object_at(elements, 3, "payload")?,
            },
            CALL_RESULT => RpcFrame::CallResult {
                message_id,
                payload: object_at(elements, 2, "payload")?,
            },
            _ => {
                let code = string_at(elements, 2, "errorCode")?;
                let error_code = serde_json::from_value(Value::String(code.clone()))
                    .map_err(|_| ProtocolError::InvalidFrame(format!("unknown error code '{}'", code)))?;
                RpcFrame::CallError {
                    message_id,
                    error_code,
                    description: string_at(elements, 3, "errorDescription")?,
                    details: object_at(elements, 4, "errorDetails")?,
                }
            }
        };
        Ok(frame)
    }

    /// Encodes the frame as a JSON array.
    pub fn to_json(&self) -> Value {
        match self {
            RpcFrame::Call {
                message_id,
                action,
                payload,
            } => json!([CALL, message_id, action, payload]),
            RpcFrame::CallResult {
                message_id,
                payload,
            } => json!([CALL_RESULT, message_id, payload]),
            RpcFrame::CallError {
                message_id,
                error_code,
                description,
                details,
            } => json!([CALL_ERROR, message_id, error_code.as_str(), description, details]),
        }
    }

    /// Encodes the frame as compact JSON text.
    pub fn to_text(&self) -> String {
        self.to_json().to_string()
    }

    pub fn message_id(&self) -> &str {
        match self {
            RpcFrame::Call { message_id, .. }
            | RpcFrame::CallResult { message_id, .. }
            | RpcFrame::CallError { message_id, .. } => message_id,
        }
    }

    pub fn message_type(&self) -> u64 {
        match self {
            RpcFrame::Call { .. } => CALL,
            RpcFrame::CallResult { .. } => CALL_RESULT,
            RpcFrame::CallError { .. } => CALL_ERROR,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RpcFrame::Call { .. } => "CALL",
            RpcFrame::CallResult { .. } => "CALLRESULT",
            RpcFrame::CallError { .. } => "CALLERROR",
        }
    }
}

fn string_at(elements: &[Value], index: usize, name: &'static str) -> Result<String, ProtocolError> {
    match elements.get(index) {
        None => Err(ProtocolError::MissingField(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ProtocolError::InvalidFrame(format!("{} must be a string", name))),
    }
}

fn object_at(elements: &[Value], index: usize, name: &'static str) -> Result<Value, ProtocolError> {
    match elements.get(index) {
        None => Err(ProtocolError::MissingField(name)),
        Some(value @ Value::Object(_)) => Ok(value.clone()),
        Some(_) => Err(ProtocolError::InvalidFrame(format!("{} must be an object", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_roundtrip() {
        let text = r#"[2,"m-1","RequestStopTransaction",{"transactionId":"t-1"}]"#;
        let frame = RpcFrame::parse(text).unwrap();
        match &frame {
            RpcFrame::Call {
                message_id,
                action,
                payload,
            } => {
                assert_eq!(message_id, "m-1");
                assert_eq!(action, "RequestStopTransaction");
                assert_eq!(payload["transactionId"], "t-1");
            }
            other => panic!("unexpected frame {:?}", other),
        }
        assert_eq!(frame.to_text(), text);
        assert_eq!(frame.type_name(), "CALL");
        assert_eq!(frame.message_type(), CALL);
    }

    #[test]
    fn test_call_result() {
        let frame = RpcFrame::parse(r#"[3, "m-2", {"status": "Accepted"}]"#).unwrap();
        assert_eq!(frame.message_id(), "m-2");
        assert_eq!(frame.type_name(), "CALLRESULT");
    }

    #[test]
    fn test_call_error() {
        let text = r#"[4,"m-3","NotSupported","QR codes unsupported",{}]"#;
        let frame = RpcFrame::parse(text).unwrap();
        match &frame {
            RpcFrame::CallError {
                error_code,
                description,
                details,
                ..
            } => {
                assert_eq!(*error_code, RpcErrorCode::NotSupported);
                assert_eq!(description, "QR codes unsupported");
                assert_eq!(details, &json!({}));
            }
            other => panic!("unexpected frame {:?}", other),
        }
        assert_eq!(frame.to_text(), text);
    }

    #[test]
    fn test_unknown_message_type() {
        let err = RpcFrame::parse(r#"[7, "m", {}]"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(7)));
    }

    #[test]
    fn test_wrong_arity() {
        let err = RpcFrame::parse(r#"[2, "m", "Action"]"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame(_)));
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            RpcFrame::parse(r#"{"a": 1}"#).unwrap_err(),
            ProtocolError::InvalidFrame(_)
        ));
        assert!(matches!(
            RpcFrame::parse("[2, ").unwrap_err(),
            ProtocolError::Json(_)
        ));
        assert!(matches!(
            RpcFrame::parse("[]").unwrap_err(),
            ProtocolError::MissingField("messageTypeId")
        ));
    }

    #[test]
    fn test_payload_must_be_object() {
        let err = RpcFrame::parse(r#"[3, "m", [1, 2]]"#).unwrap_err();
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_message_id_bounds() {
        assert!(RpcFrame::parse(r#"[3, "", {}]"#).is_err());
        let long = "x".repeat(MAX_MESSAGE_ID_LEN + 1);
        assert!(RpcFrame::parse(&format!(r#"[3, "{}", {{}}]"#, long)).is_err());

        let wide = "é".repeat(MAX_MESSAGE_ID_LEN);
        let frame = RpcFrame::parse(&format!(r#"[3, "{}", {{}}]"#, wide)).unwrap();
        assert_eq!(frame.message_id(), wide);
        let too_wide = "é".repeat(MAX_MESSAGE_ID_LEN + 1);
        assert!(RpcFrame::parse(&format!(r#"[3, "{}", {{}}]"#, too_wide)).is_err());
    }

    #[test]
    fn test_unknown_error_code() {
        let err = RpcFrame::parse(r#"[4, "m", "Oops", "d", {}]"#).unwrap_err();
        assert!(err.to_string().contains("Oops"));
    }
}
