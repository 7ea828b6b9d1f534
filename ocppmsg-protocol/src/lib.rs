//! # ocppmsg-protocol
//!
//! Signable OCPP message envelopes.
//!
//! This crate provides:
//! - Request and response envelopes generic over a typed payload
//! - Field-level JSON parsing with structured failures
//! - Signatures and vendor `customData` blocks
//! - Ed25519 signing and verification of canonical message bytes
//! - OCPP-J CALL/CALLRESULT/CALLERROR framing
//! - Response outcome taxonomy and RPC error codes

pub mod codec;
pub mod custom_data;
pub mod error;
pub mod frame;
pub mod identity;
pub mod message;
pub mod request;
pub mod response;
pub mod result;
pub mod signature;
pub mod signing;

pub use codec::{FieldReader, FieldWriter};
pub use custom_data::{CustomData, CustomSerializer};
pub use error::{EnvelopeError, ParseError, ParseErrorKind, ProtocolError, RpcErrorCode, SigningError};
pub use frame::RpcFrame;
pub use identity::{
    Destination, EventTrackingId, HashCombiner, NetworkPath, RequestId, SerializationFormat,
};
pub use message::{CustomParser, MessageKind, Payload, RequestPayload, ResponsePayload, SerializeOptions};
pub use request::{Request, RequestBuilder, RequestMeta, DEFAULT_REQUEST_TIMEOUT};
pub use response::{Response, ResponseBuilder, ResponseMeta};
pub use result::{FailureCode, Fault, ResponseResult, ResultCode};
pub use signature::{Signature, Signatures};
pub use signing::SignKey;

/// A JSON object with keys kept in insertion order.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// OCPP-J subprotocol implemented by this crate.
pub const PROTOCOL: &str = "ocpp2.1";
