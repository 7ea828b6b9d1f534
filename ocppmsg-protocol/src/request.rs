//! Request envelope.

use crate::codec::FieldReader;
use crate::custom_data::CustomData;
use crate::error::{EnvelopeError, ParseError, SigningError};
use crate::frame::RpcFrame;
use crate::identity::{
    field_hash, Destination, EventTrackingId, NetworkPath, RequestId, SerializationFormat,
};
use crate::message::{CustomParser, MessageKind, RequestPayload, SerializeOptions};
use crate::signature::{Signature, Signatures};
use crate::signing::{self, SignKey};
use crate::JsonObject;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Default time a sender waits for the response to a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity and routing metadata of a request.
///
/// None of these fields take part in envelope equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub request_id: RequestId,
    pub event_tracking_id: EventTrackingId,
    pub request_timestamp: DateTime<Utc>,
    pub request_timeout: Duration,
    pub destination: Destination,
    pub network_path: NetworkPath,
    pub serialization_format: SerializationFormat,
}

impl RequestMeta {
    pub fn new(request_id: impl Into<RequestId>, destination: impl Into<Destination>) -> Self {
        Self {
            request_id: request_id.into(),
            event_tracking_id: EventTrackingId::generate(),
            request_timestamp: Utc::now(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            destination: destination.into(),
            network_path: NetworkPath::new(),
            serialization_format: SerializationFormat::default(),
        }
    }

    pub fn with_network_path(mut self, path: NetworkPath) -> Self {
        self.network_path = path;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.request_timestamp = timestamp;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_event_tracking_id(mut self, id: EventTrackingId) -> Self {
        self.event_tracking_id = id;
        self
    }

    pub fn with_serialization_format(mut self, format: SerializationFormat) -> Self {
        self.serialization_format = format;
        self
    }
}

/// A request message: identity metadata, business payload, signatures and
/// optional custom data. Immutable once built.
#[derive(Debug, Clone)]
pub struct Request<P: RequestPayload> {
    meta: RequestMeta,
    payload: P,
    signatures: Signatures,
    custom_data: Option<CustomData>,
    hash_code: u64,
}

impl<P: RequestPayload> Request<P> {
    /// Starts building a request for `destination`.
    pub fn builder(destination: impl Into<Destination>, payload: P) -> RequestBuilder<P> {
        RequestBuilder::new(destination.into(), payload)
    }

    fn from_parts(
        meta: RequestMeta,
        payload: P,
        signatures: Signatures,
        custom_data: Option<CustomData>,
    ) -> Self {
        let hash_code = payload.fields_hash() ^ base_hash(P::ACTION, custom_data.as_ref());
        Self {
            meta,
            payload,
            signatures,
            custom_data,
            hash_code,
        }
    }

    /// Parses a request, returning the structured failure on error.
    ///
    /// Fields are extracted in order: payload (mandatory, then optional),
    /// signatures, custom data. The optional `custom_parser` runs last and
    /// its result replaces the parsed envelope.
    pub fn try_parse(
        json: &Value,
        meta: RequestMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, ParseError> {
        let result = Self::parse_inner(json, meta, custom_parser);
        match &result {
            Ok(request) => tracing::trace!(
                action = P::ACTION,
                request_id = %request.meta.request_id,
                "parsed request"
            ),
            Err(e) => tracing::debug!(action = P::ACTION, error = %e, "rejected request"),
        }
        result
    }

    fn parse_inner(
        json: &Value,
        meta: RequestMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, ParseError> {
        if meta.request_id.is_empty() {
            return Err(ParseError::ConstructionPrecondition(
                "request id must not be empty".to_string(),
            ));
        }

        let fields = FieldReader::from_value(json)?;
        let payload = P::parse_fields(&fields)?;
        payload.validate()?;
        let signatures = fields.signatures()?;
        let custom_data = fields.custom_data()?;

        let request = Self::from_parts(meta, payload, signatures, custom_data);
        match custom_parser {
            Some(hook) => hook(json, request).map_err(ParseError::UnhandledFault),
            None => Ok(request),
        }
    }

    /// Parses a request, wrapping any failure into a descriptive error that
    /// names the action, the field and the offending JSON.
    pub fn parse(
        json: &Value,
        meta: RequestMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, EnvelopeError> {
        Self::try_parse(json, meta, custom_parser).map_err(|source| EnvelopeError::InvalidJson {
            action: P::ACTION,
            kind: MessageKind::Request.as_str(),
            json: json.to_string(),
            source,
        })
    }

    /// Parses the payload of a CALL frame whose action must match `P`.
    pub fn try_from_call(
        frame: &RpcFrame,
        destination: impl Into<Destination>,
        network_path: NetworkPath,
    ) -> Result<Self, ParseError> {
        match frame {
            RpcFrame::Call {
                message_id,
                action,
                payload,
            } => {
                if action != P::ACTION {
                    return Err(ParseError::ConstructionPrecondition(format!(
                        "expected action '{}', got '{}'",
                        P::ACTION,
                        action
                    )));
                }
                let meta = RequestMeta::new(message_id.as_str(), destination)
                    .with_network_path(network_path);
                Self::try_parse(payload, meta, None)
            }
            other => Err(ParseError::ConstructionPrecondition(format!(
                "expected a CALL frame, got {}",
                other.type_name()
            ))),
        }
    }

    /// Serializes with default options.
    pub fn to_json(&self) -> Value {
        self.to_json_with(&SerializeOptions::default())
    }

    /// Serializes: `@context` (if requested), payload fields, `signatures`
    /// (if any), `customData` (if present), then the custom serializer.
    pub fn to_json_with(&self, options: &SerializeOptions<'_, Self>) -> Value {
        let mut object = self.unsigned_object(options.include_context, options);
        if let Some(signatures) = self.signatures.to_json(options.signature, options.custom_data) {
            insert_before_custom_data(&mut object, signatures);
        }
        let object = match options.custom {
            Some(hook) => hook(self, object),
            None => object,
        };
        Value::Object(object)
    }

    fn unsigned_object(
        &self,
        include_context: bool,
        options: &SerializeOptions<'_, Self>,
    ) -> JsonObject {
        let mut object = JsonObject::new();
        if include_context {
            object.insert("@context".to_string(), Value::String(P::CONTEXT.to_string()));
        }
        self.payload.write_fields(&mut object);
        if let Some(data) = &self.custom_data {
            object.insert("customData".to_string(), data.to_json(options.custom_data));
        }
        object
    }

    /// Wraps the serialized request into a CALL frame.
    pub fn to_call_frame(&self) -> RpcFrame {
        RpcFrame::Call {
            message_id: self.meta.request_id.to_string(),
            action: P::ACTION.to_string(),
            payload: self.to_json(),
        }
    }

    /// Verifies every attached signature.
    pub fn verify(&self) -> Result<(), SigningError> {
        let object = self.unsigned_object(false, &SerializeOptions::default());
        signing::verify_signatures(&object, &self.signatures)
    }

    /// Returns a copy of this request carrying an additional signature by `key`.
    pub fn signed_by(&self, key: &SignKey) -> Self {
        let object = self.unsigned_object(false, &SerializeOptions::default());
        let mut signed = self.clone();
        signed.signatures.insert(key.sign(&object));
        signed
    }

    /// Returns a copy carrying `hook`'s rewrite of this request.
    pub fn map_with(&self, hook: &CustomParser<Self>) -> Result<Self, ParseError> {
        hook(&self.to_json(), self.clone()).map_err(ParseError::UnhandledFault)
    }

    pub fn action(&self) -> &'static str {
        P::ACTION
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    pub fn request_id(&self) -> &RequestId {
        &self.meta.request_id
    }

    pub fn event_tracking_id(&self) -> &EventTrackingId {
        &self.meta.event_tracking_id
    }

    pub fn request_timestamp(&self) -> DateTime<Utc> {
        self.meta.request_timestamp
    }

    pub fn request_timeout(&self) -> Duration {
        self.meta.request_timeout
    }

    pub fn destination(&self) -> &Destination {
        &self.meta.destination
    }

    pub fn network_path(&self) -> &NetworkPath {
        &self.meta.network_path
    }

    pub fn serialization_format(&self) -> SerializationFormat {
        self.meta.serialization_format
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    /// Hash frozen at construction.
    pub fn hash_code(&self) -> u64 {
        self.hash_code
    }

    /// Point in time after which no response is expected any more.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.meta.request_timeout)
            .ok()
            .and_then(|timeout| self.meta.request_timestamp.checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

/// Structural equality: payload and custom data. Identity, routing,
/// timestamps and signatures are ignored.
impl<P: RequestPayload> PartialEq for Request<P> {
    fn eq(&self, other: &Self) -> bool {
        self.hash_code == other.hash_code
            && self.payload == other.payload
            && self.custom_data == other.custom_data
    }
}

impl<P: RequestPayload + Eq> Eq for Request<P> {}

impl<P: RequestPayload> Hash for Request<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_code.hash(state);
    }
}

pub(crate) fn base_hash(action: &str, custom_data: Option<&CustomData>) -> u64 {
    field_hash(action) ^ custom_data.map(CustomData::hash_code).unwrap_or(0)
}

/// Keeps `customData` as the last key when signatures are added afterwards.
pub(crate) fn insert_before_custom_data(object: &mut JsonObject, signatures: Value) {
    match object.shift_remove("customData") {
        Some(custom_data) => {
            object.insert("signatures".to_string(), signatures);
            object.insert("customData".to_string(), custom_data);
        }
        None => {
            object.insert("signatures".to_string(), signatures);
        }
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder<P: RequestPayload> {
    payload: P,
    meta: RequestMeta,
    request_id: Option<RequestId>,
    signatures: Signatures,
    sign_keys: Vec<SignKey>,
    custom_data: Option<CustomData>,
}

impl<P: RequestPayload> RequestBuilder<P> {
    fn new(destination: Destination, payload: P) -> Self {
        Self {
            payload,
            meta: RequestMeta::new(RequestId::new(String::new()), destination),
            request_id: None,
            signatures: Signatures::new(),
            sign_keys: Vec::new(),
            custom_data: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_event_tracking_id(mut self, id: EventTrackingId) -> Self {
        self.meta.event_tracking_id = id;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.meta.request_timestamp = timestamp;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.meta.request_timeout = timeout;
        self
    }

    pub fn with_network_path(mut self, path: NetworkPath) -> Self {
        self.meta.network_path = path;
        self
    }

    pub fn with_serialization_format(mut self, format: SerializationFormat) -> Self {
        self.meta.serialization_format = format;
        self
    }

    /// Attaches an existing signature.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.insert(signature);
        self
    }

    /// Signs the built request with `key`.
    pub fn sign_with(mut self, key: SignKey) -> Self {
        self.sign_keys.push(key);
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Validates the payload and freezes the request. A missing or empty
    /// request id is replaced by a freshly generated one.
    pub fn build(self) -> Result<Request<P>, EnvelopeError> {
        self.payload
            .validate()
            .map_err(|source| EnvelopeError::InvalidPayload {
                action: P::ACTION,
                kind: MessageKind::Request.as_str(),
                source,
            })?;

        let mut meta = self.meta;
        meta.request_id = match self.request_id {
            Some(id) if !id.is_empty() => id,
            _ => RequestId::generate(),
        };

        let mut request = Request::from_parts(meta, self.payload, self.signatures, self.custom_data);
        if !self.sign_keys.is_empty() {
            let object = request.unsigned_object(false, &SerializeOptions::default());
            for key in &self.sign_keys {
                request.signatures.insert(key.sign(&object));
            }
        }
        tracing::trace!(
            action = P::ACTION,
            request_id = %request.meta.request_id,
            "built request"
        );
        Ok(request)
    }
}
