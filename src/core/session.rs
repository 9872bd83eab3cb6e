use crate::core::flow::{BookingFlow, Completion, Effect, FlowState};
use crate::domain::model::{
    AppointmentId, AvailabilityResult, BookingDraft, Credential, ServiceId, ServiceSummary,
};
use crate::domain::ports::BookingBackend;
use crate::utils::error::{ErrorSeverity, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServicesOutcome {
    Loaded(Vec<ServiceSummary>),
    /// 另一個呼叫已在載入中
    Loading,
    Failed { message: String },
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Slots(Vec<String>),
    NoSlots,
    Failed {
        message: String,
        severity: ErrorSeverity,
    },
    /// 回應抵達時流程已關閉
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 預約已建立，呼叫端應離開此流程
    Booked(AppointmentId),
    Failed {
        message: String,
        severity: ErrorSeverity,
    },
    /// 後端已接受寫入但結果不明；流程結束，不可重送
    Unconfirmed { message: String },
    Discarded,
}

/// 供畫面呈現用的流程快照
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub draft: BookingDraft,
    pub availability: Option<AvailabilityResult>,
    pub error: Option<String>,
    pub services_error: Option<String>,
    pub can_query: bool,
    pub can_submit: bool,
}

/// 把 [`BookingFlow`] 宣告的請求交給後端執行，再把結果回送給流程。
/// 發出請求期間不持有鎖，重複的觸發會被流程本身擋下。
pub struct BookingSession<B: BookingBackend> {
    backend: Arc<B>,
    flow: Arc<Mutex<BookingFlow>>,
}

impl<B: BookingBackend> Clone for BookingSession<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            flow: Arc::clone(&self.flow),
        }
    }
}

impl<B: BookingBackend> BookingSession<B> {
    pub fn new(backend: B, credential: Credential) -> Self {
        Self::with_backend(Arc::new(backend), credential)
    }

    pub fn with_backend(backend: Arc<B>, credential: Credential) -> Self {
        Self {
            backend,
            flow: Arc::new(Mutex::new(BookingFlow::new(credential))),
        }
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let flow = self.flow.lock().await;
        FlowSnapshot {
            state: flow.state(),
            draft: flow.draft().clone(),
            availability: flow.availability().cloned(),
            error: flow.error().map(str::to_string),
            services_error: flow.services_error().map(str::to_string),
            can_query: flow.can_query(),
            can_submit: flow.can_submit(),
        }
    }

    /// 載入服務目錄；已載入時直接回傳快取的清單
    pub async fn load_services(&self) -> ServicesOutcome {
        let effect = self.flow.lock().await.load_services();
        if let Some(effect) = effect {
            if !self.run(effect).await {
                return ServicesOutcome::Discarded;
            }
        }

        let flow = self.flow.lock().await;
        if flow.services_loaded() {
            ServicesOutcome::Loaded(flow.services().to_vec())
        } else if flow.services_loading() {
            ServicesOutcome::Loading
        } else if let Some(message) = flow.services_error() {
            ServicesOutcome::Failed {
                message: message.to_string(),
            }
        } else {
            ServicesOutcome::Discarded
        }
    }

    pub async fn select_service(&self, service_id: ServiceId) -> Result<()> {
        self.flow.lock().await.select_service(service_id)
    }

    pub async fn select_date(&self, date: NaiveDate) -> Result<()> {
        self.flow.lock().await.select_date(date)
    }

    pub async fn select_slot(&self, slot: &str) -> Result<()> {
        self.flow.lock().await.select_slot(slot)
    }

    pub async fn go_back(&self) -> Result<()> {
        self.flow.lock().await.go_back()
    }

    pub async fn deactivate(&self) {
        self.flow.lock().await.deactivate();
    }

    pub async fn query_availability(&self) -> Result<QueryOutcome> {
        let effect = self.flow.lock().await.query_availability()?;
        if !self.run(effect).await {
            return Ok(QueryOutcome::Discarded);
        }

        let flow = self.flow.lock().await;
        Ok(match (flow.state(), flow.availability()) {
            (FlowState::SelectingSlot, Some(result)) if result.is_empty() => QueryOutcome::NoSlots,
            (FlowState::SelectingSlot, Some(result)) => QueryOutcome::Slots(result.slots.clone()),
            _ => {
                let (message, severity) = failure_parts(&flow);
                QueryOutcome::Failed { message, severity }
            }
        })
    }

    pub async fn submit(&self) -> Result<SubmitOutcome> {
        let effect = self.flow.lock().await.submit()?;
        if !self.run(effect).await {
            return Ok(SubmitOutcome::Discarded);
        }

        let flow = self.flow.lock().await;
        Ok(match (flow.state(), flow.appointment_id()) {
            (FlowState::Done, Some(id)) => SubmitOutcome::Booked(id.clone()),
            (FlowState::Done, None) => SubmitOutcome::Unconfirmed {
                message: failure_parts(&flow).0,
            },
            _ => {
                let (message, severity) = failure_parts(&flow);
                SubmitOutcome::Failed { message, severity }
            }
        })
    }

    /// 執行單一請求並回送結果；回傳流程是否採用了該結果
    async fn run(&self, effect: Effect) -> bool {
        let completion = match effect {
            Effect::FetchServices { ticket } => {
                Completion::Services(ticket, self.backend.list_services().await)
            }
            Effect::QueryAvailability {
                ticket,
                service_id,
                date,
            } => Completion::Availability(
                ticket,
                self.backend.query_availability(&service_id, date).await,
            ),
            Effect::CreateAppointment {
                ticket,
                request,
                credential,
            } => Completion::Submission(
                ticket,
                self.backend.create_appointment(&request, &credential).await,
            ),
        };

        self.flow.lock().await.apply(completion)
    }
}

fn failure_parts(flow: &BookingFlow) -> (String, ErrorSeverity) {
    match flow.failure() {
        Some(failure) => (failure.message.clone(), failure.severity),
        None => (String::new(), ErrorSeverity::Medium),
    }
}
