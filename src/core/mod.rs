pub mod flow;
pub mod session;

pub use crate::domain::model::{
    AppointmentId, AppointmentRequest, AvailabilityResult, BookingDraft, Credential, ManageAction,
    ServiceId, ServiceSummary,
};
pub use crate::domain::ports::{BookingBackend, ConfigProvider};
pub use crate::utils::error::Result;
