//! `RequestStopTransaction`: the CSMS asks a charging station to stop a
//! running transaction.

use crate::catalog::Action;
use crate::types::{RequestStartStopStatus, StatusInfo, TransactionId};
use ocppmsg_protocol::{
    FieldReader, FieldWriter, HashCombiner, JsonObject, MessageKind, ParseError, Payload,
    RequestPayload, ResponsePayload,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStopTransactionRequest {
    pub transaction_id: TransactionId,
}

impl RequestStopTransactionRequest {
    pub fn new(transaction_id: TransactionId) -> Self {
        Self { transaction_id }
    }
}

impl Payload for RequestStopTransactionRequest {
    const ACTION: &'static str = Action::RequestStopTransaction.as_str();
    const CONTEXT: &'static str = Action::RequestStopTransaction.context(MessageKind::Request);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            transaction_id: fields.mandatory("transactionId")?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer.put("transactionId", &self.transaction_id);
        out.extend(writer.finish());
    }

    fn fields_hash(&self) -> u64 {
        HashCombiner::new().field(3, &self.transaction_id).finish()
    }
}

impl RequestPayload for RequestStopTransactionRequest {
    type Response = RequestStopTransactionResponse;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStopTransactionResponse {
    pub status: RequestStartStopStatus,
    pub status_info: Option<StatusInfo>,
}

impl RequestStopTransactionResponse {
    pub fn accepted() -> Self {
        Self {
            status: RequestStartStopStatus::Accepted,
            status_info: None,
        }
    }

    pub fn rejected(status_info: Option<StatusInfo>) -> Self {
        Self {
            status: RequestStartStopStatus::Rejected,
            status_info,
        }
    }
}

impl Payload for RequestStopTransactionResponse {
    const ACTION: &'static str = Action::RequestStopTransaction.as_str();
    const CONTEXT: &'static str = Action::RequestStopTransaction.context(MessageKind::Response);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            status: fields.mandatory("status")?,
            status_info: fields.optional("statusInfo")?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer
            .put("status", &self.status)
            .put_optional("statusInfo", self.status_info.as_ref());
        out.extend(writer.finish());
    }

    fn validate(&self) -> Result<(), ParseError> {
        match &self.status_info {
            Some(info) => info.validate(),
            None => Ok(()),
        }
    }

    fn fields_hash(&self) -> u64 {
        HashCombiner::new()
            .field(3, &self.status)
            .optional(5, self.status_info.as_ref())
            .finish()
    }
}

impl ResponsePayload for RequestStopTransactionResponse {
    type Request = RequestStopTransactionRequest;

    fn failure() -> Self {
        Self::rejected(None)
    }
}
