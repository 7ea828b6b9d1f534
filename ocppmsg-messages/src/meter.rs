//! Meter reading value types used by `MeterValues` and transaction events.

use crate::types::check_len;
use chrono::{DateTime, Utc};
use ocppmsg_protocol::{CustomData, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a unit name.
pub const MAX_UNIT_LEN: usize = 20;

/// Maximum length of the signing or encoding method of a signed meter value.
pub const MAX_METHOD_LEN: usize = 50;

/// Maximum length of a signed meter value public key.
pub const MAX_PUBLIC_KEY_LEN: usize = 2500;

/// Maximum length of the signed meter data blob.
pub const MAX_SIGNED_METER_DATA_LEN: usize = 32768;

/// A set of samples taken at the same point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValue {
    pub timestamp: DateTime<Utc>,
    pub sampled_value: Vec<SampledValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl MeterValue {
    pub fn new(timestamp: DateTime<Utc>, sampled_value: Vec<SampledValue>) -> Self {
        Self {
            timestamp,
            sampled_value,
            custom_data: None,
        }
    }

    /// Requires at least one sample and checks every sample.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.sampled_value.is_empty() {
            return Err(ParseError::malformed(
                "sampledValue",
                "at least one sampled value is required",
            ));
        }
        self.sampled_value.iter().try_for_each(SampledValue::validate)
    }
}

/// A single measured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledValue {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurand: Option<Measurand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ReadingContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_meter_value: Option<SignedMeterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<UnitOfMeasure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl SampledValue {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            measurand: None,
            context: None,
            phase: None,
            location: None,
            signed_meter_value: None,
            unit_of_measure: None,
            custom_data: None,
        }
    }

    pub fn with_measurand(mut self, measurand: Measurand) -> Self {
        self.measurand = Some(measurand);
        self
    }

    pub fn with_context(mut self, context: ReadingContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_unit(mut self, unit: UnitOfMeasure) -> Self {
        self.unit_of_measure = Some(unit);
        self
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if !self.value.is_finite() {
            return Err(ParseError::malformed("sampledValue.value", "must be a finite number"));
        }
        if let Some(unit) = &self.unit_of_measure {
            unit.validate()?;
        }
        if let Some(signed) = &self.signed_meter_value {
            signed.validate()?;
        }
        Ok(())
    }
}

/// What was measured. Open ended: vendors may report their own measurands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measurand(String);

impl Measurand {
    pub const CURRENT_IMPORT: &'static str = "Current.Import";
    pub const ENERGY_ACTIVE_IMPORT_REGISTER: &'static str = "Energy.Active.Import.Register";
    pub const POWER_ACTIVE_IMPORT: &'static str = "Power.Active.Import";
    pub const SOC: &'static str = "SoC";
    pub const VOLTAGE: &'static str = "Voltage";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Measurand {
    fn default() -> Self {
        Self::new(Self::ENERGY_ACTIVE_IMPORT_REGISTER)
    }
}

impl fmt::Display for Measurand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a sample was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReadingContext {
    #[serde(rename = "Interruption.Begin")]
    InterruptionBegin,
    #[serde(rename = "Interruption.End")]
    InterruptionEnd,
    Other,
    #[serde(rename = "Sample.Clock")]
    SampleClock,
    #[default]
    #[serde(rename = "Sample.Periodic")]
    SamplePeriodic,
    #[serde(rename = "Transaction.Begin")]
    TransactionBegin,
    #[serde(rename = "Transaction.End")]
    TransactionEnd,
    Trigger,
}

/// Electrical phase a sample refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    L1,
    L2,
    L3,
    N,
    #[serde(rename = "L1-N")]
    L1N,
    #[serde(rename = "L2-N")]
    L2N,
    #[serde(rename = "L3-N")]
    L3N,
    #[serde(rename = "L1-L2")]
    L1L2,
    #[serde(rename = "L2-L3")]
    L2L3,
    #[serde(rename = "L3-L1")]
    L3L1,
}

/// Where a sample was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Location {
    Body,
    Cable,
    EV,
    Inlet,
    #[default]
    Outlet,
    Upstream,
}

/// Unit and decimal multiplier of a sample. Defaults to `Wh` with multiplier 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfMeasure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl UnitOfMeasure {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.into()),
            multiplier: None,
            custom_data: None,
        }
    }

    pub fn with_multiplier(mut self, multiplier: i32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn unit(&self) -> &str {
        self.unit.as_deref().unwrap_or("Wh")
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier.unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        match &self.unit {
            Some(unit) => check_len("unitOfMeasure.unit", unit, MAX_UNIT_LEN),
            None => Ok(()),
        }
    }
}

/// A meter reading signed by the meter itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMeterValue {
    pub signed_meter_data: String,
    pub signing_method: String,
    pub encoding_method: String,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl SignedMeterValue {
    pub fn validate(&self) -> Result<(), ParseError> {
        check_len(
            "signedMeterValue.signedMeterData",
            &self.signed_meter_data,
            MAX_SIGNED_METER_DATA_LEN,
        )?;
        check_len("signedMeterValue.signingMethod", &self.signing_method, MAX_METHOD_LEN)?;
        check_len("signedMeterValue.encodingMethod", &self.encoding_method, MAX_METHOD_LEN)?;
        check_len("signedMeterValue.publicKey", &self.public_key, MAX_PUBLIC_KEY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sampled_value_serde() {
        let value = json!({
            "value": 12.5,
            "measurand": "Energy.Active.Import.Register",
            "context": "Sample.Periodic",
            "phase": "L1-N",
            "location": "Outlet",
            "unitOfMeasure": {"unit": "kWh", "multiplier": 3}
        });
        let sample: SampledValue = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(sample.context, Some(ReadingContext::SamplePeriodic));
        assert_eq!(sample.phase, Some(Phase::L1N));
        assert_eq!(sample.unit_of_measure.as_ref().unwrap().unit(), "kWh");
        assert_eq!(serde_json::to_value(&sample).unwrap(), value);
    }

    #[test]
    fn test_unit_defaults() {
        let unit = UnitOfMeasure {
            unit: None,
            multiplier: None,
            custom_data: None,
        };
        assert_eq!(unit.unit(), "Wh");
        assert_eq!(unit.multiplier(), 0);
        assert_eq!(serde_json::to_value(&unit).unwrap(), json!({}));
    }

    #[test]
    fn test_unknown_reading_context_rejected() {
        assert!(serde_json::from_value::<ReadingContext>(json!("Sample.Hourly")).is_err());
    }

    #[test]
    fn test_meter_value_requires_samples() {
        let meter = MeterValue::new(Utc::now(), vec![]);
        let err = meter.validate().unwrap_err();
        assert_eq!(err.field(), Some("sampledValue"));

        let meter = MeterValue::new(Utc::now(), vec![SampledValue::new(1.0)]);
        assert!(meter.validate().is_ok());
    }

    #[test]
    fn test_unit_too_long() {
        let sample = SampledValue::new(1.0).with_unit(UnitOfMeasure::new("u".repeat(21)));
        let err = sample.validate().unwrap_err();
        assert_eq!(err.field(), Some("unitOfMeasure.unit"));
    }

    #[test]
    fn test_signed_meter_value_serde() {
        let value = json!({
            "signedMeterData": "AAEC",
            "signingMethod": "ECDSA-secp256r1-SHA256",
            "encodingMethod": "OCMF",
            "publicKey": "BASE64KEY"
        });
        let signed: SignedMeterValue = serde_json::from_value(value.clone()).unwrap();
        assert!(signed.validate().is_ok());
        assert_eq!(serde_json::to_value(&signed).unwrap(), value);
    }

    #[test]
    fn test_measurand_default() {
        assert_eq!(Measurand::default().as_str(), Measurand::ENERGY_ACTIVE_IMPORT_REGISTER);
        let custom: Measurand = serde_json::from_value(json!("Vendor.Temperature")).unwrap();
        assert_eq!(custom.to_string(), "Vendor.Temperature");
    }
}
