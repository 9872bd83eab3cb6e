use crate::config::toml_config::{ApiConfig, AuthConfig, ClientConfig, LoggingConfig};
use crate::utils::error::Result;
use crate::utils::validation::parse_iso_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, Parser)]
#[command(name = "salon-booking")]
#[command(about = "Book salon appointments against the salon REST API")]
pub struct CliConfig {
    /// Base URL of the salon API
    #[arg(long, env = "SALON_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Bearer token from the salon login
    #[arg(long, env = "SALON_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the service catalog
    Services,

    /// Show free slots for a service on a day
    Availability {
        #[arg(long)]
        service: String,

        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
    },

    /// Request an appointment
    Book {
        #[arg(long)]
        service: String,

        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,

        /// Time of day as returned by `availability`, e.g. 11:00
        #[arg(long)]
        slot: String,
    },

    /// List your appointments
    Appointments,

    /// Cancel one of your appointments
    Cancel {
        /// Appointment reference as shown by `appointments`
        #[arg(long)]
        id: String,
    },

    /// Move one of your appointments to another day or time
    Reschedule {
        #[arg(long)]
        id: String,

        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,

        #[arg(long)]
        slot: String,
    },
}

fn parse_date_arg(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_iso_date("date", value).map_err(|e| e.to_string())
}

impl CliConfig {
    /// 合併設定檔與命令列參數，命令列優先
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig {
                api: ApiConfig {
                    base_url: DEFAULT_API_BASE_URL.to_string(),
                    timeout_seconds: None,
                },
                auth: None,
                logging: None,
            },
        };

        if let Some(base_url) = &self.api_base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.api.timeout_seconds = Some(timeout);
        }
        if let Some(token) = &self.token {
            config.auth = Some(AuthConfig {
                token: Some(token.clone()),
            });
        }
        if self.log_json {
            config.logging = Some(LoggingConfig { json: Some(true) });
        }

        Ok(config)
    }
}
