//! Response envelope and failure factories.

use crate::codec::FieldReader;
use crate::custom_data::CustomData;
use crate::error::{EnvelopeError, ParseError, RpcErrorCode, SigningError};
use crate::frame::RpcFrame;
use crate::identity::{Destination, EventTrackingId, NetworkPath, RequestId, SerializationFormat};
use crate::message::{CustomParser, MessageKind, Payload, ResponsePayload, SerializeOptions};
use crate::request::{base_hash, insert_before_custom_data, Request};
use crate::result::{FailureCode, ResponseResult};
use crate::signature::{Signature, Signatures};
use crate::signing::{self, SignKey};
use crate::JsonObject;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The request a response answers.
pub type RequestOf<P> = Request<<P as ResponsePayload>::Request>;

/// Routing and timing metadata of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub response_timestamp: DateTime<Utc>,
    pub event_tracking_id: EventTrackingId,
    /// Node the response travels back to, when known.
    pub destination: Option<Destination>,
    pub network_path: NetworkPath,
    pub serialization_format: SerializationFormat,
}

impl ResponseMeta {
    /// Metadata copied from the request: tracking id, format, and the
    /// reversed path back to the origin.
    pub fn for_request<Q: crate::message::RequestPayload>(request: &Request<Q>) -> Self {
        let network_path = request.network_path().reversed();
        Self {
            response_timestamp: Utc::now(),
            event_tracking_id: request.event_tracking_id().clone(),
            destination: request.network_path().origin().map(|hop| Destination::new(hop)),
            network_path,
            serialization_format: request.serialization_format(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.response_timestamp = timestamp;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<Destination>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_network_path(mut self, path: NetworkPath) -> Self {
        self.network_path = path;
        self
    }
}

/// A response message, always tied to the request it answers.
#[derive(Debug, Clone)]
pub struct Response<P: ResponsePayload> {
    request: Arc<RequestOf<P>>,
    result: ResponseResult,
    meta: ResponseMeta,
    payload: P,
    signatures: Signatures,
    custom_data: Option<CustomData>,
    hash_code: u64,
}

impl<P: ResponsePayload> Response<P> {
    /// Starts building a successful response to `request`.
    pub fn builder(request: Arc<RequestOf<P>>, payload: P) -> ResponseBuilder<P> {
        ResponseBuilder::new(request, payload)
    }

    fn from_parts(
        request: Arc<RequestOf<P>>,
        result: ResponseResult,
        meta: ResponseMeta,
        payload: P,
        signatures: Signatures,
        custom_data: Option<CustomData>,
    ) -> Self {
        let hash_code = payload.fields_hash()
            ^ result.hash_code().wrapping_mul(7)
            ^ base_hash(P::ACTION, custom_data.as_ref());
        Self {
            request,
            result,
            meta,
            payload,
            signatures,
            custom_data,
            hash_code,
        }
    }

    fn failure(request: Arc<RequestOf<P>>, result: ResponseResult) -> Self {
        let meta = ResponseMeta::for_request(&request);
        tracing::debug!(
            action = P::ACTION,
            request_id = %request.request_id(),
            result = %result,
            "failure response"
        );
        Self::from_parts(request, result, meta, P::failure(), Signatures::new(), None)
    }

    /// Rejection before business handling, classified by the RPC error code.
    pub fn request_error(
        request: Arc<RequestOf<P>>,
        code: RpcErrorCode,
        description: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self::failure(
            request,
            ResponseResult::from_rpc_error(code, description, details),
        )
    }

    /// The request payload failed structural or schema validation.
    pub fn formation_violation(request: Arc<RequestOf<P>>, description: impl Into<String>) -> Self {
        Self::failure(
            request,
            ResponseResult::fault(FailureCode::FormationViolation, description, None),
        )
    }

    /// Signature verification of the request failed.
    pub fn signature_error(request: Arc<RequestOf<P>>, description: impl Into<String>) -> Self {
        Self::failure(
            request,
            ResponseResult::fault(FailureCode::SignatureError, description, None),
        )
    }

    /// Business handling failed for an unspecified server reason.
    pub fn failed(request: Arc<RequestOf<P>>, description: Option<String>) -> Self {
        Self::failure(
            request,
            ResponseResult::fault(
                FailureCode::ServerError,
                description.unwrap_or_else(|| "request failed".to_string()),
                None,
            ),
        )
    }

    /// Business handling raised an unexpected error. The error's source chain
    /// is kept in the fault details.
    pub fn exception_occurred(request: Arc<RequestOf<P>>, error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(Value::String(cause.to_string()));
            source = cause.source();
        }
        let details = if causes.is_empty() {
            None
        } else {
            Some(json!({ "causes": causes }))
        };
        Self::failure(
            request,
            ResponseResult::fault(FailureCode::ExceptionDerived, error.to_string(), details),
        )
    }

    /// Parses a response to `request`, returning the structured failure on
    /// error. Parsed responses always carry an `Ok` result: a failed outcome
    /// only travels as a CALLERROR, see [`Response::try_from_frame`].
    pub fn try_parse(
        request: Arc<RequestOf<P>>,
        json: &Value,
        meta: ResponseMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, ParseError> {
        let result = Self::parse_inner(request, json, meta, custom_parser);
        if let Err(e) = &result {
            tracing::debug!(action = P::ACTION, error = %e, "rejected response");
        }
        result
    }

    fn parse_inner(
        request: Arc<RequestOf<P>>,
        json: &Value,
        meta: ResponseMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, ParseError> {
        let fields = FieldReader::from_value(json)?;
        let payload = P::parse_fields(&fields)?;
        payload.validate()?;
        let signatures = fields.signatures()?;
        let custom_data = fields.custom_data()?;

        let response = Self::from_parts(
            request,
            ResponseResult::Ok,
            meta,
            payload,
            signatures,
            custom_data,
        );
        match custom_parser {
            Some(hook) => hook(json, response).map_err(ParseError::UnhandledFault),
            None => Ok(response),
        }
    }

    /// Parses a response, wrapping any failure into a descriptive error.
    pub fn parse(
        request: Arc<RequestOf<P>>,
        json: &Value,
        meta: ResponseMeta,
        custom_parser: Option<&CustomParser<Self>>,
    ) -> Result<Self, EnvelopeError> {
        Self::try_parse(request, json, meta, custom_parser).map_err(|source| {
            EnvelopeError::InvalidJson {
                action: P::ACTION,
                kind: MessageKind::Response.as_str(),
                json: json.to_string(),
                source,
            }
        })
    }

    /// Converts a CALLRESULT or CALLERROR frame answering `request`.
    ///
    /// The frame's message id must equal the request id.
    pub fn try_from_frame(request: Arc<RequestOf<P>>, frame: &RpcFrame) -> Result<Self, ParseError> {
        if frame.message_id() != request.request_id().as_str() {
            return Err(ParseError::ConstructionPrecondition(format!(
                "frame message id '{}' does not match request id '{}'",
                frame.message_id(),
                request.request_id()
            )));
        }
        match frame {
            RpcFrame::CallResult { payload, .. } => {
                let meta = ResponseMeta::for_request(&request);
                Self::try_parse(request, payload, meta, None)
            }
            RpcFrame::CallError {
                error_code,
                description,
                details,
                ..
            } => {
                let details = match details {
                    Value::Object(map) if map.is_empty() => None,
                    other => Some(other.clone()),
                };
                Ok(Self::request_error(
                    request,
                    *error_code,
                    description.clone(),
                    details,
                ))
            }
            RpcFrame::Call { .. } => Err(ParseError::ConstructionPrecondition(
                "a CALL frame cannot answer a request".to_string(),
            )),
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

    /// CALLRESULT for successful responses, CALLERROR otherwise.
    pub fn to_frame(&self) -> RpcFrame {
        let message_id = self.request.request_id().to_string();
        match self.result.fault_details() {
            None => RpcFrame::CallResult {
                message_id,
                payload: self.to_json(),
            },
            Some(fault) => RpcFrame::CallError {
                message_id,
                error_code: fault.rpc_error,
                description: fault.description.clone(),
                details: fault.details.clone().unwrap_or_else(|| json!({})),
            },
        }
    }

    pub fn verify(&self) -> Result<(), SigningError> {
        let object = self.unsigned_object(false, &SerializeOptions::default());
        signing::verify_signatures(&object, &self.signatures)
    }

    /// Returns a copy of this response carrying an additional signature by `key`.
    pub fn signed_by(&self, key: &SignKey) -> Self {
        let object = self.unsigned_object(false, &SerializeOptions::default());
        let mut signed = self.clone();
        signed.signatures.insert(key.sign(&object));
        signed
    }

    pub fn action(&self) -> &'static str {
        P::ACTION
    }

    pub fn request(&self) -> &Arc<RequestOf<P>> {
        &self.request
    }

    /// Correlation key of the originating request.
    pub fn request_id(&self) -> &RequestId {
        self.request.request_id()
    }

    pub fn result(&self) -> &ResponseResult {
        &self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    pub fn response_timestamp(&self) -> DateTime<Utc> {
        self.meta.response_timestamp
    }

    /// Time between sending the request and producing this response.
    pub fn runtime(&self) -> chrono::Duration {
        self.meta.response_timestamp - self.request.request_timestamp()
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

    pub fn hash_code(&self) -> u64 {
        self.hash_code
    }
}

/// Structural equality: payload, result and custom data.
impl<P: ResponsePayload> PartialEq for Response<P> {
    fn eq(&self, other: &Self) -> bool {
        self.hash_code == other.hash_code
            && self.payload == other.payload
            && self.result == other.result
            && self.custom_data == other.custom_data
    }
}

impl<P: ResponsePayload + Eq> Eq for Response<P> {}

impl<P: ResponsePayload> Hash for Response<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_code.hash(state);
    }
}

/// Builder for successful [`Response`]s.
#[derive(Debug)]
pub struct ResponseBuilder<P: ResponsePayload> {
    request: Arc<RequestOf<P>>,
    payload: P,
    meta: ResponseMeta,
    signatures: Signatures,
    sign_keys: Vec<SignKey>,
    custom_data: Option<CustomData>,
}

impl<P: ResponsePayload> ResponseBuilder<P> {
    fn new(request: Arc<RequestOf<P>>, payload: P) -> Self {
        let meta = ResponseMeta::for_request(&request);
        Self {
            request,
            payload,
            meta,
            signatures: Signatures::new(),
            sign_keys: Vec::new(),
            custom_data: None,
        }
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.meta.response_timestamp = timestamp;
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.insert(signature);
        self
    }

    pub fn sign_with(mut self, key: SignKey) -> Self {
        self.sign_keys.push(key);
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    pub fn build(self) -> Result<Response<P>, EnvelopeError> {
        self.payload
            .validate()
            .map_err(|source| EnvelopeError::InvalidPayload {
                action: P::ACTION,
                kind: MessageKind::Response.as_str(),
                source,
            })?;

        let mut response = Response::from_parts(
            self.request,
            ResponseResult::Ok,
            self.meta,
            self.payload,
            self.signatures,
            self.custom_data,
        );
        if !self.sign_keys.is_empty() {
            let object = response.unsigned_object(false, &SerializeOptions::default());
            for key in &self.sign_keys {
                response.signatures.insert(key.sign(&object));
            }
        }
        Ok(response)
    }
}
