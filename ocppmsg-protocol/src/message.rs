//! Payload traits implemented by every concrete message, plus the
//! parse/serialize hook types shared by both envelope kinds.

use crate::codec::FieldReader;
use crate::custom_data::{CustomData, CustomSerializer};
use crate::error::ParseError;
use crate::signature::Signature;
use crate::JsonObject;
use serde_json::Value;
use std::fmt;

/// Whether a message is a request or a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business fields of one message type.
pub trait Payload: Clone + fmt::Debug + PartialEq + Send + Sync + Sized + 'static {
    /// OCPP action name, e.g. `RequestStopTransaction`.
    const ACTION: &'static str;

    /// JSON-LD context URI, emitted only on request.
    const CONTEXT: &'static str;

    /// Extracts the payload fields. Mandatory fields first, then optional ones.
    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError>;

    /// Writes the payload fields in declaration order.
    fn write_fields(&self, out: &mut JsonObject);

    /// Checks constraints that the type system cannot express.
    fn validate(&self) -> Result<(), ParseError> {
        Ok(())
    }

    /// Prime-weighted combination of the payload's field hashes.
    fn fields_hash(&self) -> u64;
}

/// Payload of a request message.
pub trait RequestPayload: Payload {
    type Response: ResponsePayload;
}

/// Payload of a response message.
pub trait ResponsePayload: Payload {
    type Request: RequestPayload;

    /// Payload carried by failure responses built through the factories.
    fn failure() -> Self;
}

/// Post-processing hook applied to a freshly parsed envelope.
pub type CustomParser<T> = dyn Fn(&Value, T) -> Result<T, String> + Send + Sync;

/// Serialization switches and hooks for an envelope of type `T`.
pub struct SerializeOptions<'a, T> {
    /// Emit the JSON-LD `@context` URI first.
    pub include_context: bool,
    pub custom: Option<&'a CustomSerializer<T>>,
    pub signature: Option<&'a CustomSerializer<Signature>>,
    pub custom_data: Option<&'a CustomSerializer<CustomData>>,
}

impl<'a, T> SerializeOptions<'a, T> {
    pub fn new() -> Self {
        Self {
            include_context: false,
            custom: None,
            signature: None,
            custom_data: None,
        }
    }

    pub fn with_context(mut self) -> Self {
        self.include_context = true;
        self
    }

    pub fn with_serializer(mut self, hook: &'a CustomSerializer<T>) -> Self {
        self.custom = Some(hook);
        self
    }

    pub fn with_signature_serializer(mut self, hook: &'a CustomSerializer<Signature>) -> Self {
        self.signature = Some(hook);
        self
    }

    pub fn with_custom_data_serializer(mut self, hook: &'a CustomSerializer<CustomData>) -> Self {
        self.custom_data = Some(hook);
        self
    }
}

impl<T> Default for SerializeOptions<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal request/response pair used by the envelope tests.

    use super::*;
    use crate::codec::FieldWriter;
    use crate::identity::HashCombiner;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PingRequest {
        pub station: String,
        pub note: Option<String>,
    }

    impl PingRequest {
        pub fn new(station: &str) -> Self {
            Self {
                station: station.to_string(),
                note: None,
            }
        }
    }

    impl Payload for PingRequest {
        const ACTION: &'static str = "Ping";
        const CONTEXT: &'static str = "https://example.invalid/context/pingRequest";

        fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
            Ok(Self {
                station: fields.bounded_string("station", 20)?,
                note: fields.optional("note")?,
            })
        }

        fn write_fields(&self, out: &mut JsonObject) {
            let mut writer = FieldWriter::new();
            writer
                .put("station", &self.station)
                .put_optional("note", self.note.as_ref());
            out.extend(writer.finish());
        }

        fn validate(&self) -> Result<(), ParseError> {
            if self.station.is_empty() {
                return Err(ParseError::malformed("station", "must not be empty"));
            }
            Ok(())
        }

        fn fields_hash(&self) -> u64 {
            HashCombiner::new()
                .field(3, &self.station)
                .optional(5, self.note.as_ref())
                .finish()
        }
    }

    impl RequestPayload for PingRequest {
        type Response = PingResponse;
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PingResponse {
        pub alive: bool,
    }

    impl Payload for PingResponse {
        const ACTION: &'static str = "Ping";
        const CONTEXT: &'static str = "https://example.invalid/context/pingResponse";

        fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
            Ok(Self {
                alive: fields.mandatory("alive")?,
            })
        }

        fn write_fields(&self, out: &mut JsonObject) {
            out.insert("alive".to_string(), Value::Bool(self.alive));
        }

        fn fields_hash(&self) -> u64 {
            HashCombiner::new().field(3, &self.alive).finish()
        }
    }

    impl ResponsePayload for PingResponse {
        type Request = PingRequest;

        fn failure() -> Self {
            Self { alive: false }
        }
    }
}
