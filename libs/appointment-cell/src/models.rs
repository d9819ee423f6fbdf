use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::slots::allowed_slots_message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_type: AppointmentType,
    pub session_type: SessionType,
    pub date: NaiveDate,
    pub time: String,
    pub visit_type: VisitType,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-record view with the owning patient joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: AppointmentPatient,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatient {
    pub id: Uuid,
    pub name: String,
    pub contact_number: Option<String>,
}

// ==============================================================================
// VOCABULARY
// ==============================================================================
//
// Each family is stored and served as its internal code. Display labels
// ("Follow Up", "In-person", ...) are accepted on the way in and produced
// by `vocab::to_external` on the way out.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppointmentType {
    #[default]
    Consultation,
    #[serde(rename = "Follow_Up")]
    FollowUp,
    #[serde(rename = "Routine_Checkup")]
    RoutineCheckup,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Consultation => "Consultation",
            AppointmentType::FollowUp => "Follow_Up",
            AppointmentType::RoutineCheckup => "Routine_Checkup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionType {
    #[default]
    #[serde(rename = "TREATMENT")]
    Treatment,
    #[serde(rename = "INTAKE_INTERVIEW")]
    IntakeInterview,
    #[serde(rename = "FOLLOW_UP")]
    FollowUp,
    #[serde(rename = "FINAL_SESSION")]
    FinalSession,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Treatment => "TREATMENT",
            SessionType::IntakeInterview => "INTAKE_INTERVIEW",
            SessionType::FollowUp => "FOLLOW_UP",
            SessionType::FinalSession => "FINAL_SESSION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisitType {
    #[default]
    #[serde(rename = "In_person")]
    InPerson,
    Virtual,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::InPerson => "In_person",
            VisitType::Virtual => "Virtual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
    #[serde(rename = "No_show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Ongoing => "Ongoing",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "No_show",
        }
    }

    /// Scheduled and Ongoing appointments hold their slot; every other
    /// status releases it.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Ongoing)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Booking payload. Either `patientId` or `patientName` must identify the
/// patient; vocabulary fields accept internal codes or display labels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub appointment_type: Option<String>,
    pub session_type: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub visit_type: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub appointment_type: Option<String>,
    pub session_type: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub visit_type: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("either patientId or patientName is required")]
    MissingPatientRef,

    #[error("invalid time slot: {given}")]
    InvalidSlot { given: String },

    #[error("slot {time} on {date} is already booked")]
    SlotTaken { date: NaiveDate, time: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<shared_database::DbError> for AppointmentError {
    fn from(err: shared_database::DbError) -> Self {
        AppointmentError::Database(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::PatientNotFound => {
                AppError::NotFound("Patient not found".to_string())
            }
            AppointmentError::MissingPatientRef => {
                AppError::ValidationError("either patientId or patientName is required".to_string())
            }
            AppointmentError::InvalidSlot { given } => AppError::BadRequest(format!(
                "invalid time slot '{given}': {}",
                allowed_slots_message()
            )),
            AppointmentError::SlotTaken { date, time } => {
                AppError::Conflict(format!("slot {time} on {date} is already booked"))
            }
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}
