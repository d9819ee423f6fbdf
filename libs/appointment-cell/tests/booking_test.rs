use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, AppointmentListQuery, AppointmentStatus, AppointmentType,
    CreateAppointmentRequest, SessionType, UpdateAppointmentRequest, VisitType,
};
use appointment_cell::services::BookingService;
use patient_cell::models::CreatePatientRequest;
use patient_cell::services::PatientService;
use shared_database::AppState;
use shared_utils::actor::Actor;
use shared_utils::pagination::PageParams;

struct TestSetup {
    state: Arc<AppState>,
    booking: BookingService,
}

impl TestSetup {
    fn new() -> Self {
        let state = AppState::in_memory().unwrap();
        let booking = BookingService::new(&state);
        Self { state, booking }
    }

    fn add_patient(&self, name: &str) -> Uuid {
        let patients = PatientService::new(&self.state);
        patients
            .create(
                CreatePatientRequest {
                    name: name.to_string(),
                    contact_number: Some("0300-1234567".to_string()),
                    ..Default::default()
                },
                &actor(),
            )
            .unwrap()
            .id
    }

    fn booking_for(&self, patient_id: Uuid, date: &str, time: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: Some(patient_id),
            date: day(date),
            time: time.to_string(),
            ..Default::default()
        }
    }
}

fn actor() -> Actor {
    Actor {
        id: Some("tester".to_string()),
    }
}

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn booking_applies_defaults() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let appointment = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    assert_eq!(appointment.patient_id, patient_id);
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.appointment_type, AppointmentType::Consultation);
    assert_eq!(appointment.session_type, SessionType::Treatment);
    assert_eq!(appointment.visit_type, VisitType::InPerson);
    assert_eq!(appointment.time, "8:00 AM");
    assert_eq!(appointment.created_by.as_deref(), Some("tester"));
}

#[test]
fn booking_normalizes_display_labels() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let request = CreateAppointmentRequest {
        patient_id: Some(patient_id),
        appointment_type: Some("Follow Up".to_string()),
        session_type: Some("Intake Interview".to_string()),
        visit_type: Some("In-person".to_string()),
        date: day("2024-02-15"),
        time: "9:00 AM".to_string(),
        ..Default::default()
    };

    let appointment = setup.booking.create(request, &actor()).unwrap();
    assert_eq!(appointment.appointment_type, AppointmentType::FollowUp);
    assert_eq!(appointment.session_type, SessionType::IntakeInterview);
    assert_eq!(appointment.visit_type, VisitType::InPerson);
}

#[test]
fn double_booking_a_slot_conflicts() {
    let setup = TestSetup::new();
    let ahmad = setup.add_patient("Ahmad Khan");
    let sara = setup.add_patient("Sara Malik");

    setup
        .booking
        .create(setup.booking_for(ahmad, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    let err = setup
        .booking
        .create(setup.booking_for(sara, "2024-02-15", "8:00 AM"), &actor())
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotTaken { .. });
}

#[test]
fn same_slot_on_another_day_is_free() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-16", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "9:00 AM"), &actor())
        .unwrap();
}

#[test]
fn cancelled_booking_releases_the_slot() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let first = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    setup
        .booking
        .update(
            first.id,
            UpdateAppointmentRequest {
                status: Some("Cancelled".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
}

#[test]
fn off_catalog_time_is_rejected() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let err = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "7:15 AM"), &actor())
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidSlot { .. });
}

#[test]
fn booking_requires_a_patient_reference() {
    let setup = TestSetup::new();

    let err = setup
        .booking
        .create(
            CreateAppointmentRequest {
                date: day("2024-02-15"),
                time: "8:00 AM".to_string(),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap_err();
    assert_matches!(err, AppointmentError::MissingPatientRef);
}

#[test]
fn booking_unknown_patient_is_not_found() {
    let setup = TestSetup::new();

    let err = setup
        .booking
        .create(setup.booking_for(Uuid::new_v4(), "2024-02-15", "8:00 AM"), &actor())
        .unwrap_err();
    assert_matches!(err, AppointmentError::PatientNotFound);
}

#[test]
fn booking_resolves_patient_by_name_case_insensitively() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let appointment = setup
        .booking
        .create(
            CreateAppointmentRequest {
                patient_name: Some("ahmad khan".to_string()),
                date: day("2024-02-15"),
                time: "8:00 AM".to_string(),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();
    assert_eq!(appointment.patient_id, patient_id);
}

#[test]
fn list_orders_by_day_then_slot() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "2:00 PM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-14", "1:00 PM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "1:00 PM"), &actor())
        .unwrap();

    let result = setup
        .booking
        .list(&AppointmentListQuery::default(), PageParams::compat())
        .unwrap();

    let order: Vec<(NaiveDate, String)> = result
        .data
        .iter()
        .map(|a| (a.date, a.time.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (day("2024-02-14"), "1:00 PM".to_string()),
            (day("2024-02-15"), "1:00 PM".to_string()),
            (day("2024-02-15"), "2:00 PM".to_string()),
        ]
    );
}

#[test]
fn date_filter_returns_only_that_day() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-16", "8:00 AM"), &actor())
        .unwrap();

    let result = setup
        .booking
        .list(
            &AppointmentListQuery {
                date: Some(day("2024-02-15")),
                ..Default::default()
            },
            PageParams::compat(),
        )
        .unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.data[0].date, day("2024-02-15"));
}

#[test]
fn status_filter_accepts_display_labels() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let first = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "9:00 AM"), &actor())
        .unwrap();

    setup
        .booking
        .update(
            first.id,
            UpdateAppointmentRequest {
                status: Some("No show".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();

    let result = setup
        .booking
        .list(
            &AppointmentListQuery {
                status: Some("No show".to_string()),
                ..Default::default()
            },
            PageParams::compat(),
        )
        .unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.data[0].status, AppointmentStatus::NoShow);
}

#[test]
fn patient_history_is_most_recent_first() {
    let setup = TestSetup::new();
    let ahmad = setup.add_patient("Ahmad Khan");
    let sara = setup.add_patient("Sara Malik");

    setup
        .booking
        .create(setup.booking_for(ahmad, "2024-02-14", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(ahmad, "2024-02-16", "8:00 AM"), &actor())
        .unwrap();
    setup
        .booking
        .create(setup.booking_for(sara, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    let history = setup.booking.list_for_patient(ahmad).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, day("2024-02-16"));
    assert_eq!(history[1].date, day("2024-02-14"));
}

#[test]
fn get_joins_owning_patient() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let created = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    let fetched = setup.booking.get(created.id).unwrap();
    assert_eq!(fetched.appointment.id, created.id);
    assert_eq!(fetched.patient.id, patient_id);
    assert_eq!(fetched.patient.name, "Ahmad Khan");
    assert_eq!(fetched.patient.contact_number.as_deref(), Some("0300-1234567"));
}

#[test]
fn update_only_status_leaves_other_fields_intact() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let created = setup
        .booking
        .create(
            CreateAppointmentRequest {
                patient_id: Some(patient_id),
                appointment_type: Some("Follow Up".to_string()),
                date: day("2024-02-15"),
                time: "8:00 AM".to_string(),
                reason: Some("Routine follow up".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();

    let updated = setup
        .booking
        .update(
            created.id,
            UpdateAppointmentRequest {
                status: Some("Ongoing".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Ongoing);
    assert_eq!(updated.patient_id, created.patient_id);
    assert_eq!(updated.appointment_type, created.appointment_type);
    assert_eq!(updated.session_type, created.session_type);
    assert_eq!(updated.date, created.date);
    assert_eq!(updated.time, created.time);
    assert_eq!(updated.visit_type, created.visit_type);
    assert_eq!(updated.reason, created.reason);
    assert_eq!(updated.notes, created.notes);
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn moving_onto_an_occupied_slot_conflicts() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
    let second = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "9:00 AM"), &actor())
        .unwrap();

    let err = setup
        .booking
        .update(
            second.id,
            UpdateAppointmentRequest {
                time: Some("8:00 AM".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotTaken { .. });
}

#[test]
fn rescheduling_within_the_same_slot_is_allowed() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let created = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    // Re-sending the current slot must not conflict with itself.
    let updated = setup
        .booking
        .update(
            created.id,
            UpdateAppointmentRequest {
                time: Some("8:00 AM".to_string()),
                notes: Some("bring reports".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("bring reports"));
}

#[test]
fn update_rejects_off_catalog_time() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let created = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    let err = setup
        .booking
        .update(
            created.id,
            UpdateAppointmentRequest {
                time: Some("noon".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidSlot { .. });
}

#[test]
fn delete_releases_the_slot() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient("Ahmad Khan");

    let created = setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();

    setup.booking.delete(created.id, &actor()).unwrap();
    assert_matches!(setup.booking.get(created.id), Err(AppointmentError::NotFound));

    setup
        .booking
        .create(setup.booking_for(patient_id, "2024-02-15", "8:00 AM"), &actor())
        .unwrap();
}

#[test]
fn delete_missing_appointment_is_not_found() {
    let setup = TestSetup::new();

    let err = setup.booking.delete(Uuid::new_v4(), &actor()).unwrap_err();
    assert_matches!(err, AppointmentError::NotFound);
}
