//! Normalization between display labels and the internal vocabulary codes
//! appointments are stored under.
//!
//! Inbound values are folded to a typed code, falling back to the family
//! default when unrecognized. Outbound mapping echoes unknown codes
//! unchanged. Both directions log the drift instead of failing the request.

use tracing::warn;

use crate::models::{AppointmentStatus, AppointmentType, SessionType, VisitType};

pub fn appointment_type_to_internal(raw: &str) -> AppointmentType {
    match raw {
        "Consultation" => AppointmentType::Consultation,
        "Follow Up" | "Follow_Up" => AppointmentType::FollowUp,
        "Routine Check-up" | "Routine_Checkup" => AppointmentType::RoutineCheckup,
        other => {
            warn!(value = other, "unmapped appointment type, defaulting to Consultation");
            AppointmentType::default()
        }
    }
}

pub fn session_type_to_internal(raw: &str) -> SessionType {
    match raw {
        "Treatment" | "TREATMENT" => SessionType::Treatment,
        "Intake Interview" | "INTAKE_INTERVIEW" => SessionType::IntakeInterview,
        "Follow Up" | "FOLLOW_UP" => SessionType::FollowUp,
        "Final Session" | "FINAL_SESSION" => SessionType::FinalSession,
        other => {
            warn!(value = other, "unmapped session type, defaulting to TREATMENT");
            SessionType::default()
        }
    }
}

pub fn visit_type_to_internal(raw: &str) -> VisitType {
    match raw {
        "In-person" | "In_person" => VisitType::InPerson,
        "Virtual" => VisitType::Virtual,
        other => {
            warn!(value = other, "unmapped visit type, defaulting to In_person");
            VisitType::default()
        }
    }
}

pub fn status_to_internal(raw: &str) -> AppointmentStatus {
    match raw {
        "Scheduled" => AppointmentStatus::Scheduled,
        "Ongoing" => AppointmentStatus::Ongoing,
        "Completed" => AppointmentStatus::Completed,
        "Cancelled" => AppointmentStatus::Cancelled,
        "No show" | "No_show" => AppointmentStatus::NoShow,
        other => {
            warn!(value = other, "unmapped appointment status, defaulting to Scheduled");
            AppointmentStatus::default()
        }
    }
}

/// Display label for an internal code, across all four families. Codes
/// with no display mapping pass through as-is so stale data stays visible.
pub fn to_external(code: &str) -> String {
    let label = match code {
        "Consultation" => "Consultation",
        "Follow_Up" => "Follow Up",
        "Routine_Checkup" => "Routine Check-up",
        "TREATMENT" => "Treatment",
        "INTAKE_INTERVIEW" => "Intake Interview",
        "FOLLOW_UP" => "Follow Up",
        "FINAL_SESSION" => "Final Session",
        "In_person" => "In-person",
        "Virtual" => "Virtual",
        "Scheduled" => "Scheduled",
        "Ongoing" => "Ongoing",
        "Completed" => "Completed",
        "Cancelled" => "Cancelled",
        "No_show" => "No show",
        other => {
            warn!(value = other, "no display label for vocabulary code, echoing");
            return other.to_string();
        }
    };
    label.to_string()
}
