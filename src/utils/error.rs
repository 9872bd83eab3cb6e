use thiserror::Error;

/// 泛用的提交失敗訊息，後端未提供具體原因時使用
pub const GENERIC_SUBMIT_MESSAGE: &str = "We could not request this appointment. Please try again.";
pub const NETWORK_MESSAGE: &str = "We could not reach the salon. Please check your connection and try again.";
pub const REAUTHENTICATE_MESSAGE: &str =
    "Your session is no longer valid. Please sign in again before booking.";
pub const UNREADABLE_RESPONSE_MESSAGE: &str =
    "The salon sent a reply we could not read. Please try again later.";
/// 寫入已被接受但無法確認結果；不可再次送出
pub const UNCONFIRMED_SUBMIT_MESSAGE: &str = "The salon may have received your request, but we \
    could not read its confirmation. Please check your appointments before booking again.";

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Request rejected by backend: {}", .message.as_deref().unwrap_or("no details"))]
    ValidationRejected { message: Option<String> },

    #[error("Credential rejected by backend")]
    Unauthorized,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Appointment request accepted but its confirmation could not be read: {reason}")]
    SubmissionUnconfirmed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("'{action}' is not available while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("'{action}' requires {missing}")]
    IncompleteDraft {
        action: &'static str,
        missing: &'static str,
    },

    #[error("Slot '{slot}' was not offered by the last availability query")]
    UnknownSlot { slot: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Configuration,
    Flow,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BookingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::ApiError(_) => ErrorCategory::Network,
            BookingError::HttpStatus { .. }
            | BookingError::ValidationRejected { .. }
            | BookingError::Unauthorized
            | BookingError::SerializationError(_)
            | BookingError::SubmissionUnconfirmed { .. } => ErrorCategory::Backend,
            BookingError::ConfigError { .. }
            | BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BookingError::InvalidTransition { .. }
            | BookingError::IncompleteDraft { .. }
            | BookingError::UnknownSlot { .. } => ErrorCategory::Flow,
            BookingError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 使用者重新操作即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Flow => ErrorSeverity::Low,
            ErrorCategory::Backend | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 顯示給使用者的訊息。後端的驗證訊息原樣呈現。
    pub fn user_friendly_message(&self) -> String {
        match self {
            BookingError::ApiError(_) => NETWORK_MESSAGE.to_string(),
            BookingError::ValidationRejected { message: Some(m) } => m.clone(),
            BookingError::ValidationRejected { message: None } => {
                GENERIC_SUBMIT_MESSAGE.to_string()
            }
            BookingError::HttpStatus { message, .. } if !message.is_empty() => message.clone(),
            BookingError::HttpStatus { .. } => GENERIC_SUBMIT_MESSAGE.to_string(),
            BookingError::Unauthorized => REAUTHENTICATE_MESSAGE.to_string(),
            BookingError::SerializationError(_) => UNREADABLE_RESPONSE_MESSAGE.to_string(),
            BookingError::SubmissionUnconfirmed { .. } => UNCONFIRMED_SUBMIT_MESSAGE.to_string(),
            BookingError::InvalidTransition { action, state } => {
                format!("You cannot {} right now ({}).", action, state)
            }
            BookingError::IncompleteDraft { missing, .. } => {
                format!("Please choose {} first.", missing)
            }
            BookingError::UnknownSlot { slot } => {
                format!("{} is not one of the available times.", slot)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the salon API is reachable, then try again",
            ErrorCategory::Backend => match self {
                BookingError::Unauthorized => "Sign in again and pass the new token with --token",
                BookingError::SubmissionUnconfirmed { .. } => {
                    "Run `appointments` to see whether the booking exists"
                }
                BookingError::SerializationError(_) => {
                    "The salon API may have changed; try again later"
                }
                _ => "Pick another date or slot and try again",
            },
            ErrorCategory::Configuration => {
                "Check --api-base-url, --token and the configuration file"
            }
            ErrorCategory::Flow => "Complete the previous booking step first",
            ErrorCategory::System => "Re-run with --verbose and report the log",
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
