use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::{is_unique_violation, AppState, Database, DbError, DbResult};
use shared_models::activity::{ActivityAction, ActivityEvent, ActivityNotifier};
use shared_utils::actor::Actor;
use shared_utils::pagination::{PageParams, Paginated};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentPatient, AppointmentStatus,
    AppointmentWithPatient, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::slots::is_valid_slot;
use crate::vocab;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, appointment_type, session_type, date, time, \
     visit_type, status, reason, notes, created_by, created_at, updated_at";

pub struct BookingService {
    db: Database,
    activity: Arc<dyn ActivityNotifier>,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            activity: Arc::clone(&state.activity),
        }
    }

    /// List appointments with optional day, patient, and status filters,
    /// in day order (earliest date first, slots in lexical order).
    pub fn list(
        &self,
        query: &AppointmentListQuery,
        page: PageParams,
    ) -> Result<Paginated<Appointment>, AppointmentError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(day) = query.date {
            // Half-open day range, tolerant of rows that carry a
            // finer-grained stored date.
            match day.checked_add_days(Days::new(1)) {
                Some(next) => {
                    clauses.push("date >= ? AND date < ?".to_string());
                    args.push(Box::new(day));
                    args.push(Box::new(next));
                }
                None => {
                    clauses.push("date = ?".to_string());
                    args.push(Box::new(day));
                }
            }
        }
        if let Some(patient_id) = query.patient_id {
            clauses.push("patient_id = ?".to_string());
            args.push(Box::new(patient_id));
        }
        // "All" is the dashboard's no-filter sentinel.
        if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty() && *s != "All") {
            clauses.push("status = ?".to_string());
            args.push(Box::new(vocab::status_to_internal(raw).as_str()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let (data, total) = self.db.with_conn(|conn| {
            let refs: Vec<&dyn ToSql> = args.iter().map(|b| b.as_ref()).collect();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM appointments{where_sql}"),
                refs.as_slice(),
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments{where_sql} \
                 ORDER BY date ASC, time ASC LIMIT ? OFFSET ?"
            ))?;
            let mut page_refs = refs;
            let limit = page.limit;
            let offset = page.offset();
            page_refs.push(&limit);
            page_refs.push(&offset);

            let rows = stmt.query_map(page_refs.as_slice(), appointment_from_row)?;
            let data = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((data, total))
        })?;

        Ok(Paginated::new(data, total, page))
    }

    /// Single appointment with the owning patient joined in.
    pub fn get(&self, id: Uuid) -> Result<AppointmentWithPatient, AppointmentError> {
        let record = self.db.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {}, p.id, p.name, p.contact_number \
                     FROM appointments a JOIN patients p ON p.id = a.patient_id \
                     WHERE a.id = ?",
                    prefixed_columns("a")
                ),
                params![id],
                |row| {
                    Ok(AppointmentWithPatient {
                        appointment: appointment_from_row(row)?,
                        patient: AppointmentPatient {
                            id: row.get(13)?,
                            name: row.get(14)?,
                            contact_number: row.get(15)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(DbError::from)
        })?;
        record.ok_or(AppointmentError::NotFound)
    }

    /// Full history for one patient, most recent day first.
    pub fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let data = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                 WHERE patient_id = ? ORDER BY date DESC, time DESC"
            ))?;
            let rows = stmt.query_map(params![patient_id], appointment_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        Ok(data)
    }

    /// Book a slot. The patient reference is resolved first (`patientId`
    /// wins over `patientName`), the time must be on the slot catalog, and
    /// the availability check plus insert run in one transaction so a
    /// losing racer surfaces as a conflict either way.
    pub fn create(
        &self,
        request: CreateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        if request.patient_id.is_none()
            && request.patient_name.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(AppointmentError::MissingPatientRef);
        }

        let (patient_id, patient_name) = self
            .db
            .with_conn(|conn| resolve_patient(conn, &request))
            .map_err(|err| match err {
                DbError::NotFound(_) => AppointmentError::PatientNotFound,
                other => other.into(),
            })?;

        if !is_valid_slot(&request.time) {
            return Err(AppointmentError::InvalidSlot {
                given: request.time.clone(),
            });
        }

        let appointment_type = request
            .appointment_type
            .as_deref()
            .map(vocab::appointment_type_to_internal)
            .unwrap_or_default();
        let session_type = request
            .session_type
            .as_deref()
            .map(vocab::session_type_to_internal)
            .unwrap_or_default();
        let visit_type = request
            .visit_type
            .as_deref()
            .map(vocab::visit_type_to_internal)
            .unwrap_or_default();
        let status = request
            .status
            .as_deref()
            .map(vocab::status_to_internal)
            .unwrap_or(AppointmentStatus::Scheduled);

        let id = Uuid::new_v4();
        let now = Utc::now();
        let date = request.date;
        let time = request.time.clone();

        debug!("Booking slot {} on {} for appointment {}", time, date, id);

        let result = self.db.with_tx(|tx| {
            // Re-verify inside the transaction; the patient may have been
            // deleted since resolution.
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM patients WHERE id = ?",
                params![patient_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(DbError::NotFound("patient".to_string()));
            }

            if status.is_active() && slot_is_taken(tx, date, &time, None)? {
                return Err(DbError::Constraint("slot already booked".to_string()));
            }

            tx.execute(
                &format!(
                    "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    id,
                    patient_id,
                    appointment_type.as_str(),
                    session_type.as_str(),
                    date,
                    time,
                    visit_type.as_str(),
                    status.as_str(),
                    request.reason,
                    request.notes,
                    actor.id,
                    now,
                    now,
                ],
            )?;
            Ok(())
        });

        if let Err(err) = result {
            return Err(map_booking_error(err, date, &time));
        }

        self.activity.record(ActivityEvent {
            entity_type: "appointment".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Created,
            actor_id: actor.id.clone(),
            metadata: json!({
                "patientName": patient_name,
                "date": date,
                "time": time,
            }),
        });

        self.fetch(id)
    }

    /// Partial update: only supplied fields are applied. Moving an active
    /// appointment onto an occupied slot fails with a conflict; the
    /// schema-level index backstops the check.
    pub fn update(
        &self,
        id: Uuid,
        request: UpdateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        if let Some(time) = request.time.as_deref() {
            if !is_valid_slot(time) {
                return Err(AppointmentError::InvalidSlot {
                    given: time.to_string(),
                });
            }
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(raw) = request.appointment_type.as_deref() {
            sets.push("appointment_type = ?");
            args.push(Box::new(vocab::appointment_type_to_internal(raw).as_str()));
        }
        if let Some(raw) = request.session_type.as_deref() {
            sets.push("session_type = ?");
            args.push(Box::new(vocab::session_type_to_internal(raw).as_str()));
        }
        if let Some(date) = request.date {
            sets.push("date = ?");
            args.push(Box::new(date));
        }
        if let Some(time) = &request.time {
            sets.push("time = ?");
            args.push(Box::new(time.clone()));
        }
        if let Some(raw) = request.visit_type.as_deref() {
            sets.push("visit_type = ?");
            args.push(Box::new(vocab::visit_type_to_internal(raw).as_str()));
        }
        if let Some(raw) = request.status.as_deref() {
            sets.push("status = ?");
            args.push(Box::new(vocab::status_to_internal(raw).as_str()));
        }
        if let Some(reason) = &request.reason {
            sets.push("reason = ?");
            args.push(Box::new(reason.clone()));
        }
        if let Some(notes) = &request.notes {
            sets.push("notes = ?");
            args.push(Box::new(notes.clone()));
        }

        let result = self.db.with_tx(|tx| {
            let existing = tx
                .query_row(
                    &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
                    params![id],
                    appointment_from_row,
                )
                .optional()?;
            let Some(existing) = existing else {
                return Ok(None);
            };

            let date = request.date.unwrap_or(existing.date);
            let time = request.time.clone().unwrap_or_else(|| existing.time.clone());
            let status = request
                .status
                .as_deref()
                .map(vocab::status_to_internal)
                .unwrap_or(existing.status);
            let slot_moved = date != existing.date
                || time != existing.time
                || (status.is_active() && !existing.status.is_active());

            if status.is_active()
                && slot_moved
                && slot_is_taken(tx, date, &time, Some(id))?
            {
                return Err(DbError::Constraint("slot already booked".to_string()));
            }

            if !sets.is_empty() {
                sets.push("updated_at = ?");
                let now = Utc::now();
                let mut refs: Vec<&dyn ToSql> = args.iter().map(|b| b.as_ref()).collect();
                refs.push(&now);
                refs.push(&id);
                let sql = format!("UPDATE appointments SET {} WHERE id = ?", sets.join(", "));
                tx.execute(&sql, refs.as_slice())?;
            }
            Ok(Some((date, time)))
        });

        let moved_to = match result {
            Ok(Some(slot)) => slot,
            Ok(None) => return Err(AppointmentError::NotFound),
            Err(DbError::Constraint(_)) => {
                let appointment = self.fetch(id)?;
                let date = request.date.unwrap_or(appointment.date);
                let time = request.time.unwrap_or(appointment.time);
                return Err(AppointmentError::SlotTaken { date, time });
            }
            Err(DbError::Sqlite(e)) if is_unique_violation(&e) => {
                let appointment = self.fetch(id)?;
                let date = request.date.unwrap_or(appointment.date);
                let time = request.time.unwrap_or(appointment.time);
                return Err(AppointmentError::SlotTaken { date, time });
            }
            Err(err) => return Err(err.into()),
        };

        self.activity.record(ActivityEvent {
            entity_type: "appointment".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Updated,
            actor_id: actor.id.clone(),
            metadata: json!({ "date": moved_to.0, "time": moved_to.1 }),
        });

        self.fetch(id)
    }

    pub fn delete(&self, id: Uuid, actor: &Actor) -> Result<(), AppointmentError> {
        let deleted = self.db.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM appointments WHERE id = ?", params![id])? > 0)
        })?;
        if !deleted {
            return Err(AppointmentError::NotFound);
        }

        self.activity.record(ActivityEvent {
            entity_type: "appointment".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Deleted,
            actor_id: actor.id.clone(),
            metadata: json!({}),
        });

        Ok(())
    }

    fn fetch(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
                params![id],
                appointment_from_row,
            )
            .optional()
            .map_err(DbError::from)
        })?;
        appointment.ok_or(AppointmentError::NotFound)
    }
}

/// Resolve the booking's patient reference. An explicit id must exist; a
/// name matches case-insensitively, earliest registration first.
fn resolve_patient(
    conn: &Connection,
    request: &CreateAppointmentRequest,
) -> DbResult<(Uuid, String)> {
    if let Some(id) = request.patient_id {
        let found: Option<(Uuid, String)> = conn
            .query_row(
                "SELECT id, name FROM patients WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        return found.ok_or_else(|| DbError::NotFound("patient".to_string()));
    }

    if let Some(name) = request.patient_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let found: Option<(Uuid, String)> = conn
            .query_row(
                "SELECT id, name FROM patients WHERE LOWER(name) = LOWER(?) \
                 ORDER BY registered_date ASC LIMIT 1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        return found.ok_or_else(|| DbError::NotFound("patient".to_string()));
    }

    Err(DbError::Constraint("missing patient reference".to_string()))
}

/// True when an active appointment already holds the slot, optionally
/// ignoring one record (the appointment being moved).
fn slot_is_taken(
    conn: &Connection,
    date: NaiveDate,
    time: &str,
    exclude: Option<Uuid>,
) -> DbResult<bool> {
    let count: i64 = match exclude {
        Some(id) => conn.query_row(
            "SELECT COUNT(*) FROM appointments \
             WHERE date = ? AND time = ? AND status IN ('Scheduled', 'Ongoing') AND id != ?",
            params![date, time, id],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM appointments \
             WHERE date = ? AND time = ? AND status IN ('Scheduled', 'Ongoing')",
            params![date, time],
            |row| row.get(0),
        )?,
    };
    Ok(count > 0)
}

fn map_booking_error(err: DbError, date: NaiveDate, time: &str) -> AppointmentError {
    match err {
        DbError::NotFound(_) => AppointmentError::PatientNotFound,
        DbError::Constraint(msg) if msg.contains("patient reference") => {
            AppointmentError::MissingPatientRef
        }
        DbError::Constraint(_) => AppointmentError::SlotTaken {
            date,
            time: time.to_string(),
        },
        DbError::Sqlite(e) if is_unique_violation(&e) => AppointmentError::SlotTaken {
            date,
            time: time.to_string(),
        },
        other => other.into(),
    }
}

fn prefixed_columns(alias: &str) -> String {
    APPOINTMENT_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_type: vocab::appointment_type_to_internal(&row.get::<_, String>(2)?),
        session_type: row
            .get::<_, Option<String>>(3)?
            .as_deref()
            .map(vocab::session_type_to_internal)
            .unwrap_or_default(),
        date: row.get(4)?,
        time: row.get(5)?,
        visit_type: vocab::visit_type_to_internal(&row.get::<_, String>(6)?),
        status: vocab::status_to_internal(&row.get::<_, String>(7)?),
        reason: row.get(8)?,
        notes: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
