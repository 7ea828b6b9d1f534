//! Value types shared by several messages.

use ocppmsg_protocol::{CustomData, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a transaction id.
pub const MAX_TRANSACTION_ID_LEN: usize = 36;

/// Maximum length of [`StatusInfo::reason_code`].
pub const MAX_REASON_CODE_LEN: usize = 20;

/// Maximum length of [`StatusInfo::additional_info`].
pub const MAX_ADDITIONAL_INFO_LEN: usize = 512;

/// Identifier of a transaction, assigned by the charging station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Result<Self, ParseError> {
        let id = id.into();
        check_len("transactionId", &id, MAX_TRANSACTION_ID_LEN)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = String;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        let len = id.chars().count();
        if len > MAX_TRANSACTION_ID_LEN {
            return Err(format!(
                "{} characters exceeds the maximum of {}",
                len, MAX_TRANSACTION_ID_LEN
            ));
        }
        Ok(Self(id))
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

/// An EVSE on a charging station. `0` addresses the station as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvseId(pub u32);

impl EvseId {
    pub const STATION: EvseId = EvseId(0);

    pub fn is_station(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EvseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EvseId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Answer to a remote start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStartStopStatus {
    Accepted,
    Rejected,
}

impl fmt::Display for RequestStartStopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStartStopStatus::Accepted => write!(f, "Accepted"),
            RequestStartStopStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Extra detail about a status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl StatusInfo {
    pub fn new(reason_code: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.into(),
            additional_info: None,
            custom_data: None,
        }
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        check_len("statusInfo.reasonCode", &self.reason_code, MAX_REASON_CODE_LEN)?;
        if let Some(info) = &self.additional_info {
            check_len("statusInfo.additionalInfo", info, MAX_ADDITIONAL_INFO_LEN)?;
        }
        Ok(())
    }
}

/// Fails with `FieldMalformed` when `value` is longer than `max` characters.
pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), ParseError> {
    let len = value.chars().count();
    if len > max {
        return Err(ParseError::malformed(
            field,
            format!("{} characters exceeds the maximum of {}", len, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocppmsg_protocol::ParseErrorKind;
    use serde_json::json;

    #[test]
    fn test_transaction_id_bounds() {
        assert!(TransactionId::new("t-1").is_ok());
        assert!(TransactionId::new("x".repeat(MAX_TRANSACTION_ID_LEN)).is_ok());

        let err = TransactionId::new("x".repeat(MAX_TRANSACTION_ID_LEN + 1)).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::FieldMalformed);
        assert_eq!(err.field(), Some("transactionId"));
    }

    #[test]
    fn test_transaction_id_serde() {
        let id: TransactionId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc"));
        assert!(serde_json::from_value::<TransactionId>(json!("y".repeat(37))).is_err());
    }

    #[test]
    fn test_evse_id() {
        let id: EvseId = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(id, EvseId(2));
        assert!(EvseId::STATION.is_station());
        assert!(serde_json::from_value::<EvseId>(json!(-1)).is_err());
    }

    #[test]
    fn test_status_info_serde() {
        let info = StatusInfo::new("NoTransaction").with_additional_info("already stopped");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            json!({"reasonCode": "NoTransaction", "additionalInfo": "already stopped"})
        );
        let back: StatusInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_status_info_validation() {
        assert!(StatusInfo::new("ok").validate().is_ok());
        let err = StatusInfo::new("r".repeat(MAX_REASON_CODE_LEN + 1))
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("statusInfo.reasonCode"));
    }

    #[test]
    fn test_status_info_with_custom_data() {
        let value = json!({"reasonCode": "X", "customData": {"vendorId": "acme", "k": 1}});
        let info: StatusInfo = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(info.custom_data.as_ref().unwrap().vendor_id(), "acme");
        assert_eq!(serde_json::to_value(&info).unwrap(), value);
    }
}
