//! `NotifyQRCodeScanned`: the charging station reports that a QR code
//! displayed on an EVSE was scanned.

use crate::catalog::Action;
use crate::types::EvseId;
use ocppmsg_protocol::{
    FieldReader, FieldWriter, HashCombiner, JsonObject, MessageKind, ParseError, Payload,
    RequestPayload, ResponsePayload,
};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyQRCodeScannedRequest {
    pub evse_id: EvseId,
    /// How long the station waits for the scan to lead to an authorization.
    pub timeout: Duration,
}

impl NotifyQRCodeScannedRequest {
    pub fn new(evse_id: EvseId, timeout: Duration) -> Self {
        Self { evse_id, timeout }
    }
}

fn parse_seconds(value: &Value) -> Result<Duration, String> {
    value
        .as_u64()
        .map(Duration::from_secs)
        .ok_or_else(|| format!("expected a non-negative number of seconds, got {}", value))
}

impl Payload for NotifyQRCodeScannedRequest {
    const ACTION: &'static str = Action::NotifyQRCodeScanned.as_str();
    const CONTEXT: &'static str = Action::NotifyQRCodeScanned.context(MessageKind::Request);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            evse_id: fields.mandatory("evseId")?,
            timeout: fields.mandatory_with("timeout", parse_seconds)?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer
            .put("evseId", &self.evse_id)
            .put("timeout", &self.timeout.as_secs());
        out.extend(writer.finish());
    }

    fn fields_hash(&self) -> u64 {
        HashCombiner::new()
            .field(3, &self.evse_id)
            .field(5, &self.timeout)
            .finish()
    }
}

impl RequestPayload for NotifyQRCodeScannedRequest {
    type Response = NotifyQRCodeScannedResponse;
}

/// Acknowledgement without business fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyQRCodeScannedResponse;

impl Payload for NotifyQRCodeScannedResponse {
    const ACTION: &'static str = Action::NotifyQRCodeScanned.as_str();
    const CONTEXT: &'static str = Action::NotifyQRCodeScanned.context(MessageKind::Response);

    fn parse_fields(_fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self)
    }

    fn write_fields(&self, _out: &mut JsonObject) {}

    fn fields_hash(&self) -> u64 {
        0
    }
}

impl ResponsePayload for NotifyQRCodeScannedResponse {
    type Request = NotifyQRCodeScannedRequest;

    fn failure() -> Self {
        Self
    }
}
