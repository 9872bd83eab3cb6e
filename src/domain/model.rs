use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 後端的識別碼可能是數字或字串，一律以字串保存
fn opaque_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceId(pub String);

impl<'de> Deserialize<'de> for ServiceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        opaque_id(deserializer).map(Self)
    }
}

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AppointmentId(pub String);

impl<'de> Deserialize<'de> for AppointmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        opaque_id(deserializer).map(Self)
    }
}

impl AppointmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub display_name: String,
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
}

impl ServiceSummary {
    /// 下拉選單的標籤，例如 "Balayage (approx 120 min)"
    pub fn label(&self) -> String {
        match self.estimated_duration_minutes {
            Some(minutes) => format!("{} (approx {} min)", self.display_name, minutes),
            None => self.display_name.clone(),
        }
    }
}

/// 一次可用時段查詢的結果，順序與後端回傳一致
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub slots: Vec<String>,
}

impl AvailabilityResult {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}

/// 尚未送出的預約選擇
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub service_id: Option<ServiceId>,
    pub date: Option<NaiveDate>,
    pub selected_slot: Option<String>,
}

impl BookingDraft {
    pub fn is_complete(&self) -> bool {
        self.service_id.is_some() && self.date.is_some() && self.selected_slot.is_some()
    }

    /// 三個欄位都有值時才產生寫入請求
    pub fn to_request(&self) -> Option<AppointmentRequest> {
        Some(AppointmentRequest {
            service_id: self.service_id.clone()?,
            date: self.date?,
            slot: self.selected_slot.clone()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub service_id: ServiceId,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedAppointment {
    pub id: AppointmentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub id: AppointmentId,
    pub service_name: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub slot: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 對既有預約的處置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManageAction {
    Cancel,
    Reschedule {
        #[serde(rename = "newDate", serialize_with = "iso_date::serialize")]
        new_date: NaiveDate,
        #[serde(rename = "newSlot")]
        new_slot: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManageResult {
    #[serde(default)]
    pub message: Option<String>,
}

/// Bearer token，由外部登入流程取得後注入
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer_token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

pub(crate) mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
