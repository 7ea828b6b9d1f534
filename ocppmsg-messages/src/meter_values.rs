//! `MeterValues`: the charging station reports sampled meter readings for
//! an EVSE outside of a transaction event.

use crate::catalog::Action;
use crate::meter::MeterValue;
use crate::types::EvseId;
use ocppmsg_protocol::{
    FieldReader, FieldWriter, HashCombiner, JsonObject, MessageKind, ParseError, Payload,
    RequestPayload, ResponsePayload,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct MeterValuesRequest {
    pub evse_id: EvseId,
    pub meter_value: Vec<MeterValue>,
}

impl MeterValuesRequest {
    pub fn new(evse_id: EvseId, meter_value: Vec<MeterValue>) -> Self {
        Self {
            evse_id,
            meter_value,
        }
    }
}

fn parse_meter_value(value: &Value) -> Result<MeterValue, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

impl Payload for MeterValuesRequest {
    const ACTION: &'static str = Action::MeterValues.as_str();
    const CONTEXT: &'static str = Action::MeterValues.context(MessageKind::Request);

    fn parse_fields(fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            evse_id: fields.mandatory("evseId")?,
            meter_value: fields.mandatory_array("meterValue", parse_meter_value)?,
        })
    }

    fn write_fields(&self, out: &mut JsonObject) {
        let mut writer = FieldWriter::new();
        writer
            .put("evseId", &self.evse_id)
            .put("meterValue", &self.meter_value);
        out.extend(writer.finish());
    }

    fn validate(&self) -> Result<(), ParseError> {
        if self.meter_value.is_empty() {
            return Err(ParseError::malformed(
                "meterValue",
                "at least one meter value is required",
            ));
        }
        self.meter_value.iter().try_for_each(MeterValue::validate)
    }

    fn fields_hash(&self) -> u64 {
        // Samples carry floats, so they are hashed through their JSON form
        let meter_value = serde_json::to_value(&self.meter_value).unwrap_or(Value::Null);
        HashCombiner::new()
            .field(3, &self.evse_id)
            .json(5, &meter_value)
            .finish()
    }
}

impl RequestPayload for MeterValuesRequest {
    type Response = MeterValuesResponse;
}

/// Acknowledgement without business fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeterValuesResponse;

impl Payload for MeterValuesResponse {
    const ACTION: &'static str = Action::MeterValues.as_str();
    const CONTEXT: &'static str = Action::MeterValues.context(MessageKind::Response);

    fn parse_fields(_fields: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self)
    }

    fn write_fields(&self, _out: &mut JsonObject) {}

    fn fields_hash(&self) -> u64 {
        0
    }
}

impl ResponsePayload for MeterValuesResponse {
    type Request = MeterValuesRequest;

    fn failure() -> Self {
        Self
    }
}
