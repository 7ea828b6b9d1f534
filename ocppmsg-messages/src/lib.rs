//! # ocppmsg-messages
//!
//! Concrete OCPP payloads built on the `ocppmsg-protocol` envelopes.
//!
//! Each action contributes a request/response payload pair implementing
//! [`ocppmsg_protocol::RequestPayload`] and
//! [`ocppmsg_protocol::ResponsePayload`]. [`Action`] lists the supported
//! actions and maps them to their JSON-LD contexts.

pub mod catalog;
pub mod get_transaction_status;
pub mod meter;
pub mod meter_values;
pub mod notify_qr_code_scanned;
pub mod request_stop_transaction;
pub mod types;

pub use catalog::{Action, ActionVisitor, UnknownAction};
pub use get_transaction_status::{GetTransactionStatusRequest, GetTransactionStatusResponse};
pub use meter::{
    Location, MeterValue, Measurand, Phase, ReadingContext, SampledValue, SignedMeterValue,
    UnitOfMeasure,
};
pub use meter_values::{MeterValuesRequest, MeterValuesResponse};
pub use notify_qr_code_scanned::{NotifyQRCodeScannedRequest, NotifyQRCodeScannedResponse};
pub use request_stop_transaction::{RequestStopTransactionRequest, RequestStopTransactionResponse};
pub use types::{EvseId, RequestStartStopStatus, StatusInfo, TransactionId};
