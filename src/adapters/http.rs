use crate::domain::model::{
    iso_date, AppointmentId, AppointmentRequest, AppointmentSummary, AvailabilityResult,
    CreatedAppointment, Credential, ManageAction, ManageResult, ServiceId, ServiceSummary,
};
use crate::domain::ports::{BookingBackend, ConfigProvider};
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 以 reqwest 實作的預約後端
#[derive(Debug, Clone)]
pub struct HttpBookingBackend {
    base_url: String,
    client: Client,
}

impl HttpBookingBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        let url = self.endpoint("services");
        tracing::debug!("📡 GET {}", url);

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response, false).await?;
        let services: Vec<ServiceSummary> = read_json(response).await?;

        tracing::debug!("Loaded {} services", services.len());
        Ok(services)
    }

    async fn query_availability(
        &self,
        service_id: &ServiceId,
        date: NaiveDate,
    ) -> Result<AvailabilityResult> {
        let url = self.endpoint("availability");
        let date_param = date.format(iso_date::FORMAT).to_string();
        tracing::debug!("📡 GET {} (date={}, serviceId={})", url, date_param, service_id);

        let response = self
            .client
            .get(&url)
            .query(&[("date", date_param.as_str()), ("serviceId", service_id.as_str())])
            .send()
            .await?;
        let response = ensure_success(response, false).await?;
        let availability: AvailabilityResult = read_json(response).await?;

        tracing::debug!("Availability returned {} slots", availability.slots.len());
        Ok(availability)
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        credential: &Credential,
    ) -> Result<AppointmentId> {
        let url = self.endpoint("appointments");
        tracing::debug!("📡 POST {} ({} {} {})", url, request.service_id, request.date, request.slot);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.bearer_token())
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response, true).await?;
        // 已是 2xx：寫入可能已成立，讀不到回應內容時不能當成可重送的失敗
        let created: CreatedAppointment = read_json(response).await.map_err(|e| {
            BookingError::SubmissionUnconfirmed {
                reason: e.to_string(),
            }
        })?;

        tracing::info!("📅 Appointment {} created", created.id);
        Ok(created.id)
    }

    async fn list_appointments(&self, credential: &Credential) -> Result<Vec<AppointmentSummary>> {
        let url = self.endpoint("appointments");
        tracing::debug!("📡 GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.bearer_token())
            .send()
            .await?;
        let response = ensure_success(response, true).await?;
        let appointments: Vec<AppointmentSummary> = read_json(response).await?;
        Ok(appointments)
    }

    async fn manage_appointment(
        &self,
        id: &AppointmentId,
        action: &ManageAction,
        credential: &Credential,
    ) -> Result<ManageResult> {
        let url = self.endpoint(&format!("appointments/{}/manage", id));
        tracing::debug!("📡 POST {} ({:?})", url, action);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.bearer_token())
            .json(action)
            .send()
            .await?;
        let response = ensure_success(response, true).await?;
        let result: ManageResult = read_json(response).await?;

        tracing::info!("📅 Appointment {} updated", id);
        Ok(result)
    }
}

/// 解析 2xx 回應內容；格式不符屬於後端問題，不是連線失敗
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!("Unreadable response body ({}): {}", e, body);
        BookingError::SerializationError(e)
    })
}

/// 將非 2xx 回應轉為錯誤。`authorized` 為 true 時 401/403 視為憑證失效，
/// 其餘 4xx 視為後端的驗證拒絕。
async fn ensure_success(response: Response, authorized: bool) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body);
    tracing::warn!("API responded {}: {}", status, message.as_deref().unwrap_or("<no message>"));

    if authorized && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(BookingError::Unauthorized);
    }

    if authorized && status.is_client_error() {
        return Err(BookingError::ValidationRejected { message });
    }

    Err(BookingError::HttpStatus {
        status: status.as_u16(),
        message: message.unwrap_or_default(),
    })
}

/// 從結構化錯誤內容取出第一則訊息
/// 支援 {"error": ...}、{"detail": ...}、{"message": ...} 以及欄位錯誤 {"slot": ["..."]}
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["error", "detail", "message", "non_field_errors"] {
        if let Some(message) = object.get(key).and_then(first_text) {
            return Some(message);
        }
    }

    object.values().find_map(first_text)
}

fn first_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
