use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub disease: Option<String>,
    pub status: PatientStatus,
    pub registered_date: DateTime<Utc>,
    pub last_visit: Option<NaiveDate>,
    pub last_visit_time: Option<String>,
    pub next_appointment: Option<NaiveDate>,
    pub created_by: Option<String>,
    /// Present on single-record responses, omitted from list rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PatientDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    /// Parse a request value. "All" and the empty string mean "no gender
    /// set"; anything else unknown is a validation error.
    pub fn from_request(raw: &str) -> Result<Option<Self>, String> {
        match raw {
            "All" | "" => Ok(None),
            "Male" => Ok(Some(Gender::Male)),
            "Female" => Ok(Some(Gender::Female)),
            "Other" => Ok(Some(Gender::Other)),
            other => Err(format!("unknown gender value: {other}")),
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match Self::from_request(raw) {
            Ok(g) => g,
            Err(_) => {
                warn!(value = raw, "unmapped gender value in storage, dropping");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
    New,
    Archived,
    Pending,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "Active",
            PatientStatus::Inactive => "Inactive",
            PatientStatus::New => "New",
            PatientStatus::Archived => "Archived",
            PatientStatus::Pending => "Pending",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw {
            "Active" => PatientStatus::Active,
            "Inactive" => PatientStatus::Inactive,
            "New" => PatientStatus::New,
            "Archived" => PatientStatus::Archived,
            "Pending" => PatientStatus::Pending,
            other => {
                warn!(value = other, "unmapped patient status in storage, defaulting to Active");
                PatientStatus::Active
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw {
            "Yes" => YesNo::Yes,
            _ => YesNo::No,
        }
    }
}

/// Extended clinical-measurement/medication sub-record, at most one per
/// patient and owned by it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub bmi: Option<f64>,
    pub body_temperature: Option<f64>,
    pub heart_rate: Option<i64>,
    pub chronic_conditions: Vec<String>,
    pub past_major_illnesses: YesNo,
    pub past_major_illnesses_detail: Option<String>,
    pub previous_surgeries: YesNo,
    pub prescription_drugs: Vec<String>,
    pub otc_medications: Vec<String>,
    pub medication_notes: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: String,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<i64>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub disease: Option<String>,
    pub status: Option<PatientStatus>,
    pub registered_date: Option<DateTime<Utc>>,
    pub last_visit: Option<NaiveDate>,
    pub last_visit_time: Option<String>,
    pub next_appointment: Option<NaiveDate>,
    pub details: Option<PatientDetailsInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<i64>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub disease: Option<String>,
    pub status: Option<PatientStatus>,
    pub last_visit: Option<NaiveDate>,
    pub last_visit_time: Option<String>,
    pub next_appointment: Option<NaiveDate>,
    pub details: Option<PatientDetailsInput>,
}

/// Per-field-optional details payload. On create, absent fields take the
/// documented defaults; on update, absent fields leave stored values
/// untouched. List fields replace wholesale when supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetailsInput {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub bmi: Option<f64>,
    pub body_temperature: Option<f64>,
    pub heart_rate: Option<i64>,
    pub chronic_conditions: Option<Vec<String>>,
    pub past_major_illnesses: Option<YesNo>,
    pub past_major_illnesses_detail: Option<String>,
    pub previous_surgeries: Option<YesNo>,
    pub prescription_drugs: Option<Vec<String>>,
    pub otc_medications: Option<Vec<String>>,
    pub medication_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Dashboards send age as either a number or a string; anything that does
/// not coerce to a non-negative integer is dropped rather than rejected.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().filter(|a| *a >= 0),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok().filter(|a| *a >= 0),
        _ => None,
    })
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<shared_database::DbError> for PatientError {
    fn from(err: shared_database::DbError) -> Self {
        PatientError::Database(err.to_string())
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::Database(msg) => AppError::Database(msg),
        }
    }
}
