use crate::domain::model::{
    AppointmentId, AppointmentRequest, AvailabilityResult, BookingDraft, Credential, ServiceId,
    ServiceSummary,
};
use crate::utils::error::{BookingError, ErrorSeverity, Result, NETWORK_MESSAGE};
use chrono::NaiveDate;
use std::fmt;

pub const AVAILABILITY_FALLBACK_MESSAGE: &str =
    "We could not check availability. Please verify the date and try again.";
pub const SERVICES_FALLBACK_MESSAGE: &str =
    "We could not load the services. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    SelectingServiceAndDate,
    QueryingAvailability,
    SelectingSlot,
    Submitting,
    Done,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlowState::SelectingServiceAndDate => "selecting service and date",
            FlowState::QueryingAvailability => "querying availability",
            FlowState::SelectingSlot => "selecting a slot",
            FlowState::Submitting => "submitting",
            FlowState::Done => "done",
        };
        f.write_str(text)
    }
}

/// 每個發出的請求都帶一張票，回應必須帶回同一張票才會被套用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// 狀態轉換宣告要發出的請求
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchServices {
        ticket: RequestTicket,
    },
    QueryAvailability {
        ticket: RequestTicket,
        service_id: ServiceId,
        date: NaiveDate,
    },
    CreateAppointment {
        ticket: RequestTicket,
        request: AppointmentRequest,
        credential: Credential,
    },
}

/// 請求完成後回送給流程的結果
#[derive(Debug)]
pub enum Completion {
    Services(RequestTicket, Result<Vec<ServiceSummary>>),
    Availability(RequestTicket, Result<AvailabilityResult>),
    Submission(RequestTicket, Result<AppointmentId>),
}

/// 時段區塊要呈現的內容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotListing<'a> {
    NotQueried,
    NoSlots,
    Available(&'a [String]),
}

/// 畫面上的錯誤訊息與其嚴重程度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFailure {
    pub message: String,
    pub severity: ErrorSeverity,
}

impl FlowFailure {
    fn new(message: String, error: &BookingError) -> Self {
        Self {
            message,
            severity: error.severity(),
        }
    }
}

/// 單次預約精靈的狀態機。不做 I/O，請求以 [`Effect`] 交給呼叫端執行。
#[derive(Debug)]
pub struct BookingFlow {
    state: FlowState,
    draft: BookingDraft,
    availability: Option<AvailabilityResult>,
    services: Vec<ServiceSummary>,
    services_loaded: bool,
    services_error: Option<String>,
    error: Option<FlowFailure>,
    credential: Credential,
    appointment_id: Option<AppointmentId>,
    pending: Option<RequestTicket>,
    services_pending: Option<RequestTicket>,
    next_ticket: u64,
    active: bool,
}

impl BookingFlow {
    pub fn new(credential: Credential) -> Self {
        Self {
            state: FlowState::SelectingServiceAndDate,
            draft: BookingDraft::default(),
            availability: None,
            services: Vec::new(),
            services_loaded: false,
            services_error: None,
            error: None,
            credential,
            appointment_id: None,
            pending: None,
            services_pending: None,
            next_ticket: 0,
            active: true,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn availability(&self) -> Option<&AvailabilityResult> {
        self.availability.as_ref()
    }

    pub fn services(&self) -> &[ServiceSummary] {
        &self.services
    }

    pub fn services_loaded(&self) -> bool {
        self.services_loaded
    }

    pub fn services_loading(&self) -> bool {
        self.services_pending.is_some()
    }

    /// 服務目錄載入失敗的訊息，與預約步驟的錯誤分開呈現
    pub fn services_error(&self) -> Option<&str> {
        self.services_error.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|f| f.message.as_str())
    }

    pub fn failure(&self) -> Option<&FlowFailure> {
        self.error.as_ref()
    }

    pub fn appointment_id(&self) -> Option<&AppointmentId> {
        self.appointment_id.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn slot_listing(&self) -> SlotListing<'_> {
        match &self.availability {
            None => SlotListing::NotQueried,
            Some(result) if result.is_empty() => SlotListing::NoSlots,
            Some(result) => SlotListing::Available(&result.slots),
        }
    }

    /// 「查詢時段」按鈕是否可按
    pub fn can_query(&self) -> bool {
        self.active
            && self.state == FlowState::SelectingServiceAndDate
            && self.draft.service_id.is_some()
            && self.draft.date.is_some()
    }

    /// 「送出」按鈕是否可按；送出中一律停用
    pub fn can_submit(&self) -> bool {
        self.active && self.state == FlowState::SelectingSlot && self.draft.is_complete()
    }

    /// 服務目錄每個流程只載入一次
    pub fn load_services(&mut self) -> Option<Effect> {
        if !self.active || self.services_loaded || self.services_pending.is_some() {
            return None;
        }
        let ticket = self.issue_ticket();
        self.services_pending = Some(ticket);
        self.services_error = None;
        tracing::debug!("Loading service catalog");
        Some(Effect::FetchServices { ticket })
    }

    pub fn select_service(&mut self, service_id: ServiceId) -> Result<()> {
        self.ensure_state("select a service", FlowState::SelectingServiceAndDate)?;
        tracing::debug!("Service selected: {}", service_id);
        self.draft.service_id = Some(service_id);
        self.invalidate_availability();
        Ok(())
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        self.ensure_state("select a date", FlowState::SelectingServiceAndDate)?;
        tracing::debug!("Date selected: {}", date);
        self.draft.date = Some(date);
        self.invalidate_availability();
        Ok(())
    }

    pub fn query_availability(&mut self) -> Result<Effect> {
        self.ensure_state("check availability", FlowState::SelectingServiceAndDate)?;
        let (service_id, date) = match (&self.draft.service_id, self.draft.date) {
            (Some(service_id), Some(date)) => (service_id.clone(), date),
            _ => {
                return Err(BookingError::IncompleteDraft {
                    action: "check availability",
                    missing: "a service and a date",
                })
            }
        };

        let ticket = self.issue_ticket();
        self.pending = Some(ticket);
        self.error = None;
        self.transition(FlowState::QueryingAvailability);
        Ok(Effect::QueryAvailability {
            ticket,
            service_id,
            date,
        })
    }

    pub fn select_slot(&mut self, slot: &str) -> Result<()> {
        self.ensure_state("select a time", FlowState::SelectingSlot)?;
        let offered = self
            .availability
            .as_ref()
            .map(|result| result.contains(slot))
            .unwrap_or(false);
        if !offered {
            return Err(BookingError::UnknownSlot {
                slot: slot.to_string(),
            });
        }
        tracing::debug!("Slot selected: {}", slot);
        self.draft.selected_slot = Some(slot.to_string());
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Effect> {
        self.ensure_state("request the appointment", FlowState::SelectingSlot)?;
        let request = self.draft.to_request().ok_or(BookingError::IncompleteDraft {
            action: "request the appointment",
            missing: "a service, a date and a time",
        })?;

        let ticket = self.issue_ticket();
        self.pending = Some(ticket);
        self.error = None;
        self.transition(FlowState::Submitting);
        Ok(Effect::CreateAppointment {
            ticket,
            request,
            credential: self.credential.clone(),
        })
    }

    pub fn go_back(&mut self) -> Result<()> {
        self.ensure_state("change the service or date", FlowState::SelectingSlot)?;
        self.invalidate_availability();
        self.error = None;
        self.transition(FlowState::SelectingServiceAndDate);
        Ok(())
    }

    /// 元件卸載；之後抵達的回應一律忽略
    pub fn deactivate(&mut self) {
        if self.active {
            tracing::debug!("Booking flow deactivated in state '{}'", self.state);
        }
        self.active = false;
        self.pending = None;
        self.services_pending = None;
    }

    /// 套用請求結果。回傳 false 表示結果已過期而被丟棄。
    pub fn apply(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Services(ticket, result) => {
                if !self.active || self.services_pending != Some(ticket) {
                    tracing::debug!("Ignoring stale services response");
                    return false;
                }
                self.services_pending = None;
                match result {
                    Ok(services) => {
                        self.services = services;
                        self.services_loaded = true;
                    }
                    Err(e) => {
                        tracing::warn!("Loading services failed: {}", e);
                        self.services_error = Some(SERVICES_FALLBACK_MESSAGE.to_string());
                    }
                }
                true
            }
            Completion::Availability(ticket, result) => {
                if !self.accept(ticket, FlowState::QueryingAvailability) {
                    return false;
                }
                match result {
                    Ok(availability) => {
                        if availability.is_empty() {
                            tracing::info!("No slots left for the selected day");
                        }
                        self.availability = Some(availability);
                        self.draft.selected_slot = None;
                        self.transition(FlowState::SelectingSlot);
                    }
                    Err(e) => {
                        tracing::warn!("Availability query failed: {}", e);
                        self.error = Some(FlowFailure::new(availability_error_message(&e), &e));
                        self.transition(FlowState::SelectingServiceAndDate);
                    }
                }
                true
            }
            Completion::Submission(ticket, result) => {
                if !self.accept(ticket, FlowState::Submitting) {
                    return false;
                }
                match result {
                    Ok(id) => {
                        tracing::info!("✅ Appointment requested: {}", id);
                        self.appointment_id = Some(id);
                        self.transition(FlowState::Done);
                    }
                    Err(e @ BookingError::SubmissionUnconfirmed { .. }) => {
                        // 後端可能已建立預約，不回到可送出的狀態
                        tracing::error!("⚠️ Appointment request unconfirmed: {}", e);
                        self.error = Some(FlowFailure::new(e.user_friendly_message(), &e));
                        self.transition(FlowState::Done);
                    }
                    Err(e) => {
                        tracing::warn!("Appointment request failed: {}", e);
                        self.error = Some(FlowFailure::new(e.user_friendly_message(), &e));
                        self.transition(FlowState::SelectingSlot);
                    }
                }
                true
            }
        }
    }

    fn accept(&mut self, ticket: RequestTicket, expected: FlowState) -> bool {
        if !self.active || self.pending != Some(ticket) || self.state != expected {
            tracing::debug!("Ignoring stale response {:?}", ticket);
            return false;
        }
        self.pending = None;
        true
    }

    fn ensure_state(&self, action: &'static str, expected: FlowState) -> Result<()> {
        if !self.active {
            return Err(BookingError::InvalidTransition {
                action,
                state: "the booking flow is closed".to_string(),
            });
        }
        if self.state != expected {
            return Err(BookingError::InvalidTransition {
                action,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn invalidate_availability(&mut self) {
        self.availability = None;
        self.draft.selected_slot = None;
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.next_ticket += 1;
        RequestTicket(self.next_ticket)
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!("Booking flow: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// 查詢失敗時的訊息：連線問題用通用文字，後端有訊息就直接顯示
fn availability_error_message(error: &BookingError) -> String {
    match error {
        BookingError::ApiError(_) => NETWORK_MESSAGE.to_string(),
        BookingError::HttpStatus { message, .. } if !message.is_empty() => message.clone(),
        _ => AVAILABILITY_FALLBACK_MESSAGE.to_string(),
    }
}
