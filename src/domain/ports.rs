use crate::domain::model::{
    AppointmentId, AppointmentRequest, AppointmentSummary, AvailabilityResult, Credential,
    ManageAction, ManageResult, ServiceId, ServiceSummary,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn credential(&self) -> Option<Credential>;
}

/// 預約後端提供的 HTTP 合約
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceSummary>>;

    async fn query_availability(
        &self,
        service_id: &ServiceId,
        date: NaiveDate,
    ) -> Result<AvailabilityResult>;

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        credential: &Credential,
    ) -> Result<AppointmentId>;

    async fn list_appointments(&self, credential: &Credential) -> Result<Vec<AppointmentSummary>>;

    /// 取消或改期既有預約
    async fn manage_appointment(
        &self,
        id: &AppointmentId,
        action: &ManageAction,
        credential: &Credential,
    ) -> Result<ManageResult>;
}
