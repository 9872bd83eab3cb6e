use clap::Parser;
use salon_booking::config::Command;
use salon_booking::core::{
    AppointmentId, BookingBackend, ConfigProvider, Credential, ManageAction, ServiceId,
};
use salon_booking::utils::error::{ErrorSeverity, Result};
use salon_booking::utils::logger;
use salon_booking::utils::validation::{validate_required_field, Validate};
use salon_booking::{
    BookingSession, CliConfig, HttpBookingBackend, QueryOutcome, ServicesOutcome, SubmitOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logging() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting salon-booking CLI");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let backend = HttpBookingBackend::from_config(&config)?;

    if let Err(e) = run(cli.command, backend, config.credential()).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(exit_code(e.severity()));
    }

    Ok(())
}

/// 只有 Medium（連線問題）代表稍後重試可能成功
fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

async fn run(
    command: Command,
    backend: HttpBookingBackend,
    credential: Option<Credential>,
) -> Result<()> {
    match command {
        Command::Services => {
            let services = backend.list_services().await?;
            if services.is_empty() {
                println!("No services are offered right now.");
            }
            for service in services {
                println!("{:>6}  {}", service.id, service.label());
            }
        }
        Command::Availability { service, date } => {
            let result = backend
                .query_availability(&ServiceId::new(service), date)
                .await?;
            if result.is_empty() {
                println!("No slots left on {}. Try another date.", date);
            } else {
                println!("Available on {}: {}", date, result.slots.join("  "));
            }
        }
        Command::Book {
            service,
            date,
            slot,
        } => {
            let credential = require_credential(credential)?;
            book(backend, credential, ServiceId::new(service), date, &slot).await?;
        }
        Command::Appointments => {
            let credential = require_credential(credential)?;
            let appointments = backend.list_appointments(&credential).await?;
            if appointments.is_empty() {
                println!("You have no appointments.");
            }
            for appointment in appointments {
                println!(
                    "{:>6}  {} {}  {}  [{}]",
                    appointment.id,
                    appointment.date,
                    appointment.slot,
                    appointment.service_name,
                    appointment.status.as_deref().unwrap_or("requested")
                );
            }
        }
        Command::Cancel { id } => {
            let credential = require_credential(credential)?;
            let id = AppointmentId(id);
            let result = backend
                .manage_appointment(&id, &ManageAction::Cancel, &credential)
                .await?;
            println!(
                "✅ {}",
                result.message.as_deref().unwrap_or("Appointment cancelled.")
            );
        }
        Command::Reschedule { id, date, slot } => {
            let credential = require_credential(credential)?;
            let id = AppointmentId(id);
            let action = ManageAction::Reschedule {
                new_date: date,
                new_slot: slot,
            };
            let result = backend.manage_appointment(&id, &action, &credential).await?;
            println!(
                "✅ {}",
                result.message.as_deref().unwrap_or("Appointment moved.")
            );
        }
    }

    Ok(())
}

/// 依序走完預約流程：服務與日期 → 查詢時段 → 選擇時段 → 送出
async fn book(
    backend: HttpBookingBackend,
    credential: Credential,
    service_id: ServiceId,
    date: chrono::NaiveDate,
    slot: &str,
) -> Result<()> {
    let session = BookingSession::new(backend, credential);

    match session.load_services().await {
        ServicesOutcome::Loaded(services) => {
            match services.iter().find(|s| s.id == service_id) {
                Some(service) => {
                    tracing::info!("Booking {} on {} at {}", service.label(), date, slot)
                }
                None => tracing::warn!("Service {} is not in the catalog", service_id),
            }
        }
        // 目錄只用於顯示，載入失敗不影響預約
        ServicesOutcome::Failed { message } => tracing::warn!("{}", message),
        ServicesOutcome::Loading | ServicesOutcome::Discarded => {}
    }

    session.select_service(service_id).await?;
    session.select_date(date).await?;

    match session.query_availability().await? {
        QueryOutcome::Slots(slots) => {
            tracing::debug!("Offered slots: {:?}", slots);
        }
        QueryOutcome::NoSlots => {
            println!("No slots left on {}. Try another date.", date);
            return Ok(());
        }
        QueryOutcome::Failed { message, severity } => {
            eprintln!("❌ {}", message);
            std::process::exit(exit_code(severity));
        }
        QueryOutcome::Discarded => return Ok(()),
    }

    if let Err(e) = session.select_slot(slot).await {
        let offered = session
            .snapshot()
            .await
            .availability
            .map(|a| a.slots.join("  "))
            .unwrap_or_default();
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Available on {}: {}", date, offered);
        std::process::exit(1);
    }

    match session.submit().await? {
        SubmitOutcome::Booked(id) => {
            println!("✅ Appointment requested! Reference: {}", id);
            println!("The salon will review your request and confirm it soon.");
        }
        SubmitOutcome::Failed { message, severity } => {
            eprintln!("❌ {}", message);
            std::process::exit(exit_code(severity));
        }
        SubmitOutcome::Unconfirmed { message } => {
            eprintln!("⚠️ {}", message);
            eprintln!("💡 Run `salon-booking appointments` before trying again.");
            std::process::exit(1);
        }
        SubmitOutcome::Discarded => {}
    }

    Ok(())
}

fn require_credential(credential: Option<Credential>) -> Result<Credential> {
    validate_required_field("token (--token or SALON_TOKEN)", &credential).cloned()
}
