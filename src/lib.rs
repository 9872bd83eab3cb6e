pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::HttpBookingBackend;
pub use crate::config::ClientConfig;
pub use crate::core::flow::{BookingFlow, FlowState};
pub use crate::core::session::{BookingSession, QueryOutcome, ServicesOutcome, SubmitOutcome};
pub use crate::utils::error::{BookingError, Result};
