//! Outcome taxonomy shared by every response.

use crate::error::RpcErrorCode;
use crate::identity::{field_hash, json_hash};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Tag of a [`ResponseResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Ok,
    FormationViolation,
    SignatureError,
    ServerError,
    ExceptionDerived,
}

impl ResultCode {
    /// Classifies an RPC error code received from (or destined for) a peer.
    pub fn from_rpc_error(code: RpcErrorCode) -> Self {
        FailureCode::from_rpc_error(code).into()
    }

    /// The RPC error code used on the wire when no specific one was given.
    pub fn default_rpc_error(&self) -> Option<RpcErrorCode> {
        FailureCode::try_from(*self)
            .ok()
            .map(|code| code.default_rpc_error())
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Ok => write!(f, "Ok"),
            ResultCode::FormationViolation => write!(f, "FormationViolation"),
            ResultCode::SignatureError => write!(f, "SignatureError"),
            ResultCode::ServerError => write!(f, "ServerError"),
            ResultCode::ExceptionDerived => write!(f, "ExceptionDerived"),
        }
    }
}

/// The tags of a failed [`ResponseResult`]: every [`ResultCode`] except `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    FormationViolation,
    SignatureError,
    ServerError,
    ExceptionDerived,
}

impl FailureCode {
    pub fn from_rpc_error(code: RpcErrorCode) -> Self {
        match code {
            RpcErrorCode::FormatViolation
            | RpcErrorCode::OccurrenceConstraintViolation
            | RpcErrorCode::PropertyConstraintViolation
            | RpcErrorCode::TypeConstraintViolation
            | RpcErrorCode::ProtocolError => FailureCode::FormationViolation,
            RpcErrorCode::SecurityError => FailureCode::SignatureError,
            RpcErrorCode::InternalError => FailureCode::ExceptionDerived,
            RpcErrorCode::MessageTypeNotSupported
            | RpcErrorCode::NotImplemented
            | RpcErrorCode::NotSupported
            | RpcErrorCode::GenericError
            | RpcErrorCode::RpcFrameworkError => FailureCode::ServerError,
        }
    }

    pub fn default_rpc_error(&self) -> RpcErrorCode {
        match self {
            FailureCode::FormationViolation => RpcErrorCode::FormatViolation,
            FailureCode::SignatureError => RpcErrorCode::SecurityError,
            FailureCode::ServerError => RpcErrorCode::GenericError,
            FailureCode::ExceptionDerived => RpcErrorCode::InternalError,
        }
    }
}

impl From<FailureCode> for ResultCode {
    fn from(code: FailureCode) -> Self {
        match code {
            FailureCode::FormationViolation => ResultCode::FormationViolation,
            FailureCode::SignatureError => ResultCode::SignatureError,
            FailureCode::ServerError => ResultCode::ServerError,
            FailureCode::ExceptionDerived => ResultCode::ExceptionDerived,
        }
    }
}

impl TryFrom<ResultCode> for FailureCode {
    type Error = ResultCode;

    /// Fails with the code itself for [`ResultCode::Ok`].
    fn try_from(code: ResultCode) -> Result<Self, Self::Error> {
        match code {
            ResultCode::Ok => Err(code),
            ResultCode::FormationViolation => Ok(FailureCode::FormationViolation),
            ResultCode::SignatureError => Ok(FailureCode::SignatureError),
            ResultCode::ServerError => Ok(FailureCode::ServerError),
            ResultCode::ExceptionDerived => Ok(FailureCode::ExceptionDerived),
        }
    }
}

/// Details of a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub description: String,
    pub details: Option<Value>,
    /// Code reported to the peer in a CALLERROR frame.
    pub rpc_error: RpcErrorCode,
}

impl Hash for Fault {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.description.hash(state);
        self.details.as_ref().map(json_hash).hash(state);
        self.rpc_error.hash(state);
    }
}

/// Outcome of handling a request. Exactly one tag is ever set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseResult {
    Ok,
    FormationViolation(Fault),
    SignatureError(Fault),
    ServerError(Fault),
    ExceptionDerived(Fault),
}

impl ResponseResult {
    fn failure(code: FailureCode, fault: Fault) -> Self {
        match code {
            FailureCode::FormationViolation => ResponseResult::FormationViolation(fault),
            FailureCode::SignatureError => ResponseResult::SignatureError(fault),
            FailureCode::ServerError => ResponseResult::ServerError(fault),
            FailureCode::ExceptionDerived => ResponseResult::ExceptionDerived(fault),
        }
    }

    /// A failed result with the default RPC error code of its tag.
    pub fn fault(code: FailureCode, description: impl Into<String>, details: Option<Value>) -> Self {
        Self::failure(
            code,
            Fault {
                description: description.into(),
                details,
                rpc_error: code.default_rpc_error(),
            },
        )
    }

    /// A failed result whose tag is derived from an RPC error code.
    pub fn from_rpc_error(
        rpc_error: RpcErrorCode,
        description: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self::failure(
            FailureCode::from_rpc_error(rpc_error),
            Fault {
                description: description.into(),
                details,
                rpc_error,
            },
        )
    }

    pub fn code(&self) -> ResultCode {
        match self {
            ResponseResult::Ok => ResultCode::Ok,
            ResponseResult::FormationViolation(_) => ResultCode::FormationViolation,
            ResponseResult::SignatureError(_) => ResultCode::SignatureError,
            ResponseResult::ServerError(_) => ResultCode::ServerError,
            ResponseResult::ExceptionDerived(_) => ResultCode::ExceptionDerived,
        }
    }

    pub fn fault_details(&self) -> Option<&Fault> {
        match self {
            ResponseResult::Ok => None,
            ResponseResult::FormationViolation(fault)
            | ResponseResult::SignatureError(fault)
            | ResponseResult::ServerError(fault)
            | ResponseResult::ExceptionDerived(fault) => Some(fault),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.fault_details().map(|f| f.description.as_str())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseResult::Ok)
    }

    pub(crate) fn hash_code(&self) -> u64 {
        field_hash(self)
    }
}

impl fmt::Display for ResponseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fault_details() {
            None => write!(f, "Ok"),
            Some(fault) => write!(
                f,
                "{} ({}): {}",
                self.code(),
                fault.rpc_error,
                fault.description
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_error_classification() {
        assert_eq!(
            ResultCode::from_rpc_error(RpcErrorCode::TypeConstraintViolation),
            ResultCode::FormationViolation
        );
        assert_eq!(
            ResultCode::from_rpc_error(RpcErrorCode::SecurityError),
            ResultCode::SignatureError
        );
        assert_eq!(
            ResultCode::from_rpc_error(RpcErrorCode::NotImplemented),
            ResultCode::ServerError
        );
        assert_eq!(
            ResultCode::from_rpc_error(RpcErrorCode::InternalError),
            ResultCode::ExceptionDerived
        );
    }

    #[test]
    fn test_fault_uses_default_code() {
        let result = ResponseResult::fault(FailureCode::SignatureError, "bad sig", None);
        assert_eq!(result.code(), ResultCode::SignatureError);
        assert_eq!(
            result.fault_details().unwrap().rpc_error,
            RpcErrorCode::SecurityError
        );
        assert_eq!(result.description(), Some("bad sig"));
        assert!(!result.is_ok());
    }

    #[test]
    fn test_from_rpc_error_keeps_code() {
        let result = ResponseResult::from_rpc_error(
            RpcErrorCode::NotSupported,
            "no QR support",
            Some(json!({"hint": "upgrade"})),
        );
        assert_eq!(result.code(), ResultCode::ServerError);
        let fault = result.fault_details().unwrap();
        assert_eq!(fault.rpc_error, RpcErrorCode::NotSupported);
        assert_eq!(fault.details, Some(json!({"hint": "upgrade"})));
    }

    #[test]
    fn test_ok_is_not_a_failure_code() {
        assert_eq!(FailureCode::try_from(ResultCode::Ok), Err(ResultCode::Ok));
        assert_eq!(ResultCode::Ok.default_rpc_error(), None);
        for code in [
            FailureCode::FormationViolation,
            FailureCode::SignatureError,
            FailureCode::ServerError,
            FailureCode::ExceptionDerived,
        ] {
            let result = ResponseResult::fault(code, "x", None);
            assert_eq!(result.code(), ResultCode::from(code));
            assert_eq!(FailureCode::try_from(result.code()), Ok(code));
        }
    }

    #[test]
    fn test_ok_has_no_fault() {
        assert!(ResponseResult::Ok.is_ok());
        assert!(ResponseResult::Ok.fault_details().is_none());
        assert_eq!(ResponseResult::Ok.to_string(), "Ok");
    }

    #[test]
    fn test_display() {
        let result = ResponseResult::fault(FailureCode::FormationViolation, "evseId missing", None);
        assert_eq!(
            result.to_string(),
            "FormationViolation (FormatViolation): evseId missing"
        );
    }

    #[test]
    fn test_hash_follows_equality() {
        let a = ResponseResult::fault(FailureCode::ServerError, "x", Some(json!({"a": 1, "b": 2})));
        let b = ResponseResult::fault(FailureCode::ServerError, "x", Some(json!({"b": 2, "a": 1})));
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
        assert_ne!(a.hash_code(), ResponseResult::Ok.hash_code());
    }
}
