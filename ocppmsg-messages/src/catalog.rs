//! Closed set of supported actions and their JSON-LD context URIs.

use crate::get_transaction_status::GetTransactionStatusRequest;
use crate::meter_values::MeterValuesRequest;
use crate::notify_qr_code_scanned::NotifyQRCodeScannedRequest;
use crate::request_stop_transaction::RequestStopTransactionRequest;
use ocppmsg_protocol::{MessageKind, RequestPayload, ResponsePayload};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Base of every context URI.
pub const CONTEXT_BASE: &str = "https://open.charging.cloud/context/ocpp/";

/// An OCPP action this crate has payload types for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    RequestStopTransaction,
    GetTransactionStatus,
    MeterValues,
    NotifyQRCodeScanned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

/// Receives the payload types of one action; see [`Action::visit`].
pub trait ActionVisitor {
    type Output;

    fn visit<Q>(self) -> Self::Output
    where
        Q: RequestPayload,
        Q::Response: ResponsePayload<Request = Q>;
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::RequestStopTransaction,
        Action::GetTransactionStatus,
        Action::MeterValues,
        Action::NotifyQRCodeScanned,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::RequestStopTransaction => "RequestStopTransaction",
            Action::GetTransactionStatus => "GetTransactionStatus",
            Action::MeterValues => "MeterValues",
            Action::NotifyQRCodeScanned => "NotifyQRCodeScanned",
        }
    }

    /// The node role that sends the request: `csms` or `cs`.
    pub const fn initiator(&self) -> &'static str {
        match self {
            Action::RequestStopTransaction | Action::GetTransactionStatus => "csms",
            Action::MeterValues | Action::NotifyQRCodeScanned => "cs",
        }
    }

    /// JSON-LD context URI of the request or response of this action.
    pub const fn context(&self, kind: MessageKind) -> &'static str {
        match (self, kind) {
            (Action::RequestStopTransaction, MessageKind::Request) => {
                "https://open.charging.cloud/context/ocpp/csms/requestStopTransactionRequest"
            }
            (Action::RequestStopTransaction, MessageKind::Response) => {
                "https://open.charging.cloud/context/ocpp/csms/requestStopTransactionResponse"
            }
            (Action::GetTransactionStatus, MessageKind::Request) => {
                "https://open.charging.cloud/context/ocpp/csms/getTransactionStatusRequest"
            }
            (Action::GetTransactionStatus, MessageKind::Response) => {
                "https://open.charging.cloud/context/ocpp/csms/getTransactionStatusResponse"
            }
            (Action::MeterValues, MessageKind::Request) => {
                "https://open.charging.cloud/context/ocpp/cs/meterValuesRequest"
            }
            (Action::MeterValues, MessageKind::Response) => {
                "https://open.charging.cloud/context/ocpp/cs/meterValuesResponse"
            }
            (Action::NotifyQRCodeScanned, MessageKind::Request) => {
                "https://open.charging.cloud/context/ocpp/cs/notifyQRCodeScannedRequest"
            }
            (Action::NotifyQRCodeScanned, MessageKind::Response) => {
                "https://open.charging.cloud/context/ocpp/cs/notifyQRCodeScannedResponse"
            }
        }
    }

    /// Calls `visitor` with the request payload type of this action.
    pub fn visit<V: ActionVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Action::RequestStopTransaction => visitor.visit::<RequestStopTransactionRequest>(),
            Action::GetTransactionStatus => visitor.visit::<GetTransactionStatusRequest>(),
            Action::MeterValues => visitor.visit::<MeterValuesRequest>(),
            Action::NotifyQRCodeScanned => visitor.visit::<NotifyQRCodeScannedRequest>(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::get_transaction_status::GetTransactionStatusResponse;
    use crate::meter_values::MeterValuesResponse;
    use crate::notify_qr_code_scanned::NotifyQRCodeScannedResponse;
    use crate::request_stop_transaction::RequestStopTransactionResponse;
    use ocppmsg_protocol::Payload;

    #[test]
    fn test_parse_action_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        let err = "StartTransaction".parse::<Action>().unwrap_err();
        assert_eq!(err.to_string(), "unknown action: StartTransaction");
    }

    #[test]
    fn test_contexts_follow_initiator() {
        for action in Action::ALL {
            for kind in [MessageKind::Request, MessageKind::Response] {
                let context = action.context(kind);
                let prefix = format!("{}{}/", CONTEXT_BASE, action.initiator());
                assert!(context.starts_with(&prefix), "{}", context);
            }
        }
    }

    #[test]
    fn test_payload_constants_match_catalog() {
        assert_eq!(
            RequestStopTransactionRequest::CONTEXT,
            Action::RequestStopTransaction.context(MessageKind::Request)
        );
        assert_eq!(
            RequestStopTransactionResponse::ACTION,
            Action::RequestStopTransaction.as_str()
        );
        assert_eq!(
            GetTransactionStatusResponse::CONTEXT,
            "https://open.charging.cloud/context/ocpp/csms/getTransactionStatusResponse"
        );
        assert_eq!(MeterValuesResponse::ACTION, "MeterValues");
        assert_eq!(
            NotifyQRCodeScannedResponse::CONTEXT,
            "https://open.charging.cloud/context/ocpp/cs/notifyQRCodeScannedResponse"
        );
    }

    struct ActionName;

    impl ActionVisitor for ActionName {
        type Output = &'static str;

        fn visit<Q>(self) -> &'static str
        where
            Q: RequestPayload,
            Q::Response: ResponsePayload<Request = Q>,
        {
            Q::ACTION
        }
    }

    #[test]
    fn test_visit_dispatches_payload_type() {
        for action in Action::ALL {
            assert_eq!(action.visit(ActionName), action.as_str());
        }
    }
}
