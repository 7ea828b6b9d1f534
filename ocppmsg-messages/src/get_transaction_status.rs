//! `GetTransactionStatus`: the CSMS asks whether a transaction is still
//! ongoing and whether transaction messages are still queued for delivery.

use crate::catalog::Action;
use crate::types::TransactionId;
use ocppmsg_protocol::{
    FieldReader, FieldWriter, HashCombiner, JsonObject, MessageKind, ParseError, Payload,
    RequestPayload, ResponsePayload,
};

/// Without a transaction id the question covers all transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTransactionStatusRequest {
    pub transaction_id: Option<TransactionId>,
}

impl GetTransactionStatusRequest {
    pub fn for_transaction(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id: Some(transaction_id),
        }
    }
}

impl Payload for GetTransactionStatusRequest {
    const ACTION: &'static str = Action::GetTransactionStatus.as_str();
    const CONTEXT: &'static str = Action::GetTransactionStatus.context(MessageKind::Request);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            transaction_id: fields.optional("transactionId")?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer.put_optional("transactionId", self.transaction_id.as_ref());
        out.extend(writer.finish());
    }

    fn fields_hash(&self) -> u64 {
        HashCombiner::new()
            .optional(3, self.transaction_id.as_ref())
            .finish()
    }
}

impl RequestPayload for GetTransactionStatusRequest {
    type Response = GetTransactionStatusResponse;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTransactionStatusResponse {
    /// Absent when the request named no transaction.
    pub ongoing_indicator: Option<bool>,
    pub messages_in_queue: bool,
}

impl Payload for GetTransactionStatusResponse {
    const ACTION: &'static str = Action::GetTransactionStatus.as_str();
    const CONTEXT: &'static str = Action::GetTransactionStatus.context(MessageKind::Response);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            messages_in_queue: fields.mandatory("messagesInQueue")?,
            ongoing_indicator: fields.optional("ongoingIndicator")?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer
            .put_optional("ongoingIndicator", self.ongoing_indicator.as_ref())
            .put("messagesInQueue", &self.messages_in_queue);
        out.extend(writer.finish());
    }

    fn fields_hash(&self) -> u64 {
        HashCombiner::new()
            .optional(3, self.ongoing_indicator.as_ref())
            .field(5, &self.messages_in_queue)
            .finish()
    }
}

impl ResponsePayload for GetTransactionStatusResponse {
    type Request = GetTransactionStatusRequest;

    fn failure() -> Self {
        Self {
            ongoing_indicator: None,
            messages_in_queue: false,
        }
    }
}
