use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use salon_booking::core::{AppointmentId, BookingBackend, Credential, ManageAction, ServiceId};
use salon_booking::domain::model::AppointmentRequest;
use salon_booking::utils::error::UNREADABLE_RESPONSE_MESSAGE;
use salon_booking::{BookingError, HttpBookingBackend};
use std::time::Duration;

fn backend_for(server: &MockServer) -> HttpBookingBackend {
    HttpBookingBackend::new(server.url("/api"), Duration::from_secs(5)).unwrap()
}

fn march_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

#[tokio::test]
async fn test_list_services() -> Result<()> {
    let server = MockServer::start();
    let services_mock = server.mock(|when, then| {
        when.method(GET).path("/api/services");
        then.status(200).json_body(serde_json::json!([
            {"id": 42, "displayName": "Balayage", "estimatedDurationMinutes": 120},
            {"id": "7", "displayName": "Corte"}
        ]));
    });

    let services = backend_for(&server).list_services().await?;

    services_mock.assert();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].id, ServiceId::new("42"));
    assert_eq!(services[0].label(), "Balayage (approx 120 min)");
    assert_eq!(services[1].estimated_duration_minutes, None);
    Ok(())
}

#[tokio::test]
async fn test_query_availability_sends_date_and_service() -> Result<()> {
    let server = MockServer::start();
    let availability_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/availability")
            .query_param("date", "2025-03-10")
            .query_param("serviceId", "42");
        then.status(200)
            .json_body(serde_json::json!({"slots": ["10:00", "11:00"]}));
    });

    let result = backend_for(&server)
        .query_availability(&ServiceId::new("42"), march_10())
        .await?;

    availability_mock.assert();
    assert_eq!(result.slots, vec!["10:00".to_string(), "11:00".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_day_message_is_surfaced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/availability");
        then.status(400)
            .json_body(serde_json::json!({"error": "No atendemos los domingos."}));
    });

    let err = backend_for(&server)
        .query_availability(&ServiceId::new("42"), march_10())
        .await
        .unwrap_err();

    match err {
        BookingError::HttpStatus { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "No atendemos los domingos.");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_create_appointment_posts_payload_with_bearer() -> Result<()> {
    let server = MockServer::start();
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/appointments")
            .header("Authorization", "Bearer secret-token")
            .json_body(serde_json::json!({
                "serviceId": "42",
                "date": "2025-03-10",
                "slot": "11:00"
            }));
        then.status(201).json_body(serde_json::json!({"id": 900}));
    });

    let request = AppointmentRequest {
        service_id: ServiceId::new("42"),
        date: march_10(),
        slot: "11:00".to_string(),
    };
    let id = backend_for(&server)
        .create_appointment(&request, &Credential::new("secret-token"))
        .await?;

    create_mock.assert();
    assert_eq!(id.as_str(), "900");
    Ok(())
}

#[tokio::test]
async fn test_create_appointment_validation_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/appointments");
        then.status(400)
            .json_body(serde_json::json!({"slot": ["slot already booked"]}));
    });

    let request = AppointmentRequest {
        service_id: ServiceId::new("42"),
        date: march_10(),
        slot: "11:00".to_string(),
    };
    let err = backend_for(&server)
        .create_appointment(&request, &Credential::new("t"))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::ValidationRejected { .. }));
    assert_eq!(err.user_friendly_message(), "slot already booked");
}

#[tokio::test]
async fn test_create_appointment_rejected_credential() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/appointments");
        then.status(401)
            .json_body(serde_json::json!({"detail": "Token is invalid or expired"}));
    });

    let request = AppointmentRequest {
        service_id: ServiceId::new("42"),
        date: march_10(),
        slot: "11:00".to_string(),
    };
    let err = backend_for(&server)
        .create_appointment(&request, &Credential::new("expired"))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Unauthorized));
}

#[tokio::test]
async fn test_list_appointments() -> Result<()> {
    let server = MockServer::start();
    let list_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/appointments")
            .header("Authorization", "Bearer t");
        then.status(200).json_body(serde_json::json!([
            {"id": 900, "serviceName": "Balayage", "date": "2025-03-10", "slot": "11:00", "status": "requested"}
        ]));
    });

    let appointments = backend_for(&server)
        .list_appointments(&Credential::new("t"))
        .await?;

    list_mock.assert();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id.as_str(), "900");
    assert_eq!(appointments[0].date, march_10());
    assert_eq!(appointments[0].status.as_deref(), Some("requested"));
    Ok(())
}

#[tokio::test]
async fn test_connection_failure_is_api_error() {
    let backend =
        HttpBookingBackend::new("http://127.0.0.1:1/api", Duration::from_secs(2)).unwrap();

    let err = backend.list_services().await.unwrap_err();

    assert!(matches!(err, BookingError::ApiError(_)));
    assert_eq!(
        err.user_friendly_message(),
        salon_booking::utils::error::NETWORK_MESSAGE
    );
}

#[tokio::test]
async fn test_unexpected_body_is_serialization_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/services");
        then.status(200).body("<html>maintenance</html>");
    });

    let err = backend_for(&server).list_services().await.unwrap_err();

    assert!(matches!(err, BookingError::SerializationError(_)));
    assert_eq!(err.user_friendly_message(), UNREADABLE_RESPONSE_MESSAGE);
}

#[tokio::test]
async fn test_created_without_id_is_unconfirmed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/appointments");
        then.status(201)
            .json_body(serde_json::json!({"appointmentId": 900}));
    });

    let request = AppointmentRequest {
        service_id: ServiceId::new("42"),
        date: march_10(),
        slot: "11:00".to_string(),
    };
    let err = backend_for(&server)
        .create_appointment(&request, &Credential::new("t"))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SubmissionUnconfirmed { .. }));
}

#[tokio::test]
async fn test_cancel_appointment() -> Result<()> {
    let server = MockServer::start();
    let manage_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/appointments/900/manage")
            .header("Authorization", "Bearer t")
            .json_body(serde_json::json!({"action": "CANCEL"}));
        then.status(200)
            .json_body(serde_json::json!({"message": "Appointment cancelled."}));
    });

    let result = backend_for(&server)
        .manage_appointment(
            &AppointmentId("900".to_string()),
            &ManageAction::Cancel,
            &Credential::new("t"),
        )
        .await?;

    manage_mock.assert();
    assert_eq!(result.message.as_deref(), Some("Appointment cancelled."));
    Ok(())
}

#[tokio::test]
async fn test_reschedule_inside_notice_window_is_rejected() {
    let server = MockServer::start();
    let manage_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/appointments/900/manage")
            .json_body(serde_json::json!({
                "action": "RESCHEDULE",
                "newDate": "2025-03-12",
                "newSlot": "15:30"
            }));
        then.status(400).json_body(serde_json::json!({
            "blockMessage": "Changes are not possible less than 48 hours before the appointment."
        }));
    });

    let action = ManageAction::Reschedule {
        new_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
        new_slot: "15:30".to_string(),
    };
    let err = backend_for(&server)
        .manage_appointment(&AppointmentId("900".to_string()), &action, &Credential::new("t"))
        .await
        .unwrap_err();

    manage_mock.assert();
    assert_eq!(
        err.user_friendly_message(),
        "Changes are not possible less than 48 hours before the appointment."
    );
}
