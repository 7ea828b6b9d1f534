//! Error types and RPC error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured failure produced while extracting an envelope from JSON.
///
/// Every variant names the offending field (or block) and carries the
/// underlying reason text, so a log line is enough to diagnose a rejected
/// message without re-parsing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing mandatory field '{field}'")]
    FieldMissing { field: String },

    #[error("invalid value for field '{field}': {reason}")]
    FieldMalformed { field: String, reason: String },

    #[error("invalid signature at index {index}: {reason}")]
    SignatureInvalid { index: usize, reason: String },

    #[error("invalid customData: {reason}")]
    ExtensionDataInvalid { reason: String },

    #[error("precondition violated: {0}")]
    ConstructionPrecondition(String),

    #[error("unhandled fault: {0}")]
    UnhandledFault(String),
}

/// Tag of a [`ParseError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    FieldMissing,
    FieldMalformed,
    SignatureInvalid,
    ExtensionDataInvalid,
    ConstructionPrecondition,
    UnhandledFault,
}

impl ParseError {
    pub fn missing(field: impl Into<String>) -> Self {
        ParseError::FieldMissing {
            field: field.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::FieldMalformed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::FieldMissing { .. } => ParseErrorKind::FieldMissing,
            ParseError::FieldMalformed { .. } => ParseErrorKind::FieldMalformed,
            ParseError::SignatureInvalid { .. } => ParseErrorKind::SignatureInvalid,
            ParseError::ExtensionDataInvalid { .. } => ParseErrorKind::ExtensionDataInvalid,
            ParseError::ConstructionPrecondition(_) => ParseErrorKind::ConstructionPrecondition,
            ParseError::UnhandledFault(_) => ParseErrorKind::UnhandledFault,
        }
    }

    /// Returns the JSON field this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ParseError::FieldMissing { field } | ParseError::FieldMalformed { field, .. } => {
                Some(field)
            }
            ParseError::SignatureInvalid { .. } => Some("signatures"),
            ParseError::ExtensionDataInvalid { .. } => Some("customData"),
            _ => None,
        }
    }

    /// The RPC error code a peer should receive for this failure.
    pub fn rpc_error_code(&self) -> RpcErrorCode {
        match self {
            ParseError::FieldMissing { .. } => RpcErrorCode::OccurrenceConstraintViolation,
            ParseError::FieldMalformed { .. } => RpcErrorCode::FormatViolation,
            ParseError::SignatureInvalid { .. } => RpcErrorCode::SecurityError,
            ParseError::ExtensionDataInvalid { .. } => RpcErrorCode::FormatViolation,
            ParseError::ConstructionPrecondition(_) => RpcErrorCode::ProtocolError,
            ParseError::UnhandledFault(_) => RpcErrorCode::InternalError,
        }
    }
}

/// Errors raised by envelope construction and by the throwing parse form.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("the given JSON representation of a {action} {kind} is invalid: {source} (JSON: {json})")]
    InvalidJson {
        action: &'static str,
        kind: &'static str,
        json: String,
        #[source]
        source: ParseError,
    },

    #[error("invalid {action} {kind}: {source}")]
    InvalidPayload {
        action: &'static str,
        kind: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
}

impl EnvelopeError {
    /// Returns the structured parse error behind this failure, if any.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            EnvelopeError::InvalidJson { source, .. } => Some(source),
            EnvelopeError::InvalidPayload { source, .. } => Some(source),
            EnvelopeError::Signing(_) => None,
        }
    }
}

/// Errors from creating or checking Ed25519 message signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("unsupported signing method: {0}")]
    UnsupportedMethod(String),

    #[error("malformed signature value from key '{key_id}': {reason}")]
    MalformedSignature { key_id: String, reason: String },

    #[error("signature from key '{key_id}' does not match the message")]
    VerificationFailed { key_id: String },
}

/// Frame-level errors of the OCPP-J RPC layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid RPC frame: {0}")]
    InvalidFrame(String),

    #[error("unknown RPC message type: {0}")]
    UnknownMessageType(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required frame element: {0}")]
    MissingField(&'static str),
}

/// Stable OCPP-J RPC error codes carried in CALLERROR frames.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcErrorCode {
    // Payload validation errors
    FormatViolation,
    OccurrenceConstraintViolation,
    PropertyConstraintViolation,
    TypeConstraintViolation,
    ProtocolError,

    // Security errors
    SecurityError,

    // Capability errors
    MessageTypeNotSupported,
    NotImplemented,
    NotSupported,

    // System errors
    GenericError,
    InternalError,
    RpcFrameworkError,
}

impl RpcErrorCode {
    /// Returns whether the request may succeed if sent again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcErrorCode::InternalError | RpcErrorCode::GenericError | RpcErrorCode::RpcFrameworkError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorCode::FormatViolation => "FormatViolation",
            RpcErrorCode::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            RpcErrorCode::PropertyConstraintViolation => "PropertyConstraintViolation",
            RpcErrorCode::TypeConstraintViolation => "TypeConstraintViolation",
            RpcErrorCode::ProtocolError => "ProtocolError",
            RpcErrorCode::SecurityError => "SecurityError",
            RpcErrorCode::MessageTypeNotSupported => "MessageTypeNotSupported",
            RpcErrorCode::NotImplemented => "NotImplemented",
            RpcErrorCode::NotSupported => "NotSupported",
            RpcErrorCode::GenericError => "GenericError",
            RpcErrorCode::InternalError => "InternalError",
            RpcErrorCode::RpcFrameworkError => "RpcFrameworkError",
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
