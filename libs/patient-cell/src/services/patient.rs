use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::{AppState, Database, DbResult};
use shared_models::activity::{ActivityAction, ActivityEvent, ActivityNotifier};
use shared_utils::actor::Actor;
use shared_utils::pagination::{PageParams, Paginated};

use crate::models::{
    CreatePatientRequest, Gender, Patient, PatientDetails, PatientDetailsInput, PatientError,
    PatientListQuery, PatientStatus, UpdatePatientRequest,
};

const PATIENT_COLUMNS: &str = "id, name, gender, age, address, contact_number, disease, \
     status, registered_date, last_visit, last_visit_time, next_appointment, created_by";

const DETAIL_COLUMNS: &str = "weight, height, bmi, body_temperature, heart_rate, \
     chronic_conditions, past_major_illnesses, past_major_illnesses_detail, \
     previous_surgeries, prescription_drugs, otc_medications, medication_notes";

pub struct PatientService {
    db: Database,
    activity: Arc<dyn ActivityNotifier>,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            activity: Arc::clone(&state.activity),
        }
    }

    /// List patients with optional search and exact-match filters.
    /// `search` matches name and disease case-insensitively and contact
    /// number partially, OR'ed across the three fields. Ordered by
    /// registration date, newest first.
    pub fn list(
        &self,
        query: &PatientListQuery,
        page: PageParams,
    ) -> Result<Paginated<Patient>, PatientError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            clauses.push(
                "(LOWER(name) LIKE ? OR LOWER(COALESCE(disease, '')) LIKE ? \
                 OR COALESCE(contact_number, '') LIKE ?)"
                    .to_string(),
            );
            let ci_pattern = format!("%{}%", term.to_lowercase());
            args.push(Box::new(ci_pattern.clone()));
            args.push(Box::new(ci_pattern));
            args.push(Box::new(format!("%{term}%")));
        }

        // "All" is the dashboard's no-filter sentinel.
        for (column, value) in [("gender", &query.gender), ("status", &query.status)] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty() && *v != "All") {
                clauses.push(format!("{column} = ?"));
                args.push(Box::new(v.to_string()));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let result = self.db.with_conn(|conn| {
            let refs: Vec<&dyn ToSql> = args.iter().map(|b| b.as_ref()).collect();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM patients{where_sql}"),
                refs.as_slice(),
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients{where_sql} \
                 ORDER BY registered_date DESC LIMIT ? OFFSET ?"
            ))?;
            let mut page_refs = refs;
            let limit = page.limit;
            let offset = page.offset();
            page_refs.push(&limit);
            page_refs.push(&offset);

            let rows = stmt.query_map(page_refs.as_slice(), patient_from_row)?;
            let data = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((data, total))
        })?;

        let (data, total) = result;
        Ok(Paginated::new(data, total, page))
    }

    pub fn get(&self, id: Uuid) -> Result<Patient, PatientError> {
        let patient = self.db.with_conn(|conn| fetch_patient(conn, id))?;
        patient.ok_or(PatientError::NotFound)
    }

    pub fn create(
        &self,
        request: CreatePatientRequest,
        actor: &Actor,
    ) -> Result<Patient, PatientError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(PatientError::Validation("name is required".to_string()));
        }
        let gender = match request.gender.as_deref() {
            Some(raw) => Gender::from_request(raw).map_err(PatientError::Validation)?,
            None => None,
        };

        let id = Uuid::new_v4();
        let registered_date = request.registered_date.unwrap_or_else(Utc::now);
        let status = request.status.unwrap_or_default();

        debug!("Creating patient record for: {}", name);

        self.db.with_tx(|tx| {
            tx.execute(
                &format!("INSERT INTO patients ({PATIENT_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
                params![
                    id,
                    name,
                    gender.map(|g| g.as_str()),
                    request.age,
                    request.address,
                    request.contact_number,
                    request.disease,
                    status.as_str(),
                    registered_date,
                    request.last_visit,
                    request.last_visit_time,
                    request.next_appointment,
                    actor.id,
                ],
            )?;

            if let Some(details) = &request.details {
                insert_details(tx, id, details)?;
            }
            Ok(())
        })?;

        self.activity.record(ActivityEvent {
            entity_type: "patient".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Created,
            actor_id: actor.id.clone(),
            metadata: json!({ "name": name }),
        });

        self.get(id)
    }

    /// Partial update: only supplied fields are applied. A nested `details`
    /// payload upserts (create-with-defaults when absent, merge when
    /// present).
    pub fn update(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
        actor: &Actor,
    ) -> Result<Patient, PatientError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = &request.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(PatientError::Validation("name cannot be empty".to_string()));
            }
            sets.push("name = ?");
            args.push(Box::new(name.to_string()));
        }
        if let Some(raw) = &request.gender {
            // "All" clears the stored gender, mirroring create semantics.
            let gender = Gender::from_request(raw).map_err(PatientError::Validation)?;
            sets.push("gender = ?");
            args.push(Box::new(gender.map(|g| g.as_str())));
        }
        if let Some(age) = request.age {
            sets.push("age = ?");
            args.push(Box::new(age));
        }
        if let Some(address) = &request.address {
            sets.push("address = ?");
            args.push(Box::new(address.clone()));
        }
        if let Some(contact) = &request.contact_number {
            sets.push("contact_number = ?");
            args.push(Box::new(contact.clone()));
        }
        if let Some(disease) = &request.disease {
            sets.push("disease = ?");
            args.push(Box::new(disease.clone()));
        }
        if let Some(status) = request.status {
            sets.push("status = ?");
            args.push(Box::new(status.as_str()));
        }
        if let Some(last_visit) = request.last_visit {
            sets.push("last_visit = ?");
            args.push(Box::new(last_visit));
        }
        if let Some(last_visit_time) = &request.last_visit_time {
            sets.push("last_visit_time = ?");
            args.push(Box::new(last_visit_time.clone()));
        }
        if let Some(next_appointment) = request.next_appointment {
            sets.push("next_appointment = ?");
            args.push(Box::new(next_appointment));
        }

        let name = self.db.with_tx(|tx| {
            let existing: Option<String> = tx
                .query_row("SELECT name FROM patients WHERE id = ?", params![id], |r| {
                    r.get(0)
                })
                .optional()?;
            let Some(name) = existing else {
                return Ok(None);
            };

            if !sets.is_empty() {
                let sql = format!("UPDATE patients SET {} WHERE id = ?", sets.join(", "));
                let mut refs: Vec<&dyn ToSql> = args.iter().map(|b| b.as_ref()).collect();
                refs.push(&id);
                tx.execute(&sql, refs.as_slice())?;
            }

            if let Some(details) = &request.details {
                upsert_details(tx, id, details)?;
            }
            Ok(Some(name))
        })?;

        let name = name.ok_or(PatientError::NotFound)?;

        self.activity.record(ActivityEvent {
            entity_type: "patient".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Updated,
            actor_id: actor.id.clone(),
            metadata: json!({ "name": name }),
        });

        self.get(id)
    }

    /// Delete a patient; details and appointments cascade.
    pub fn delete(&self, id: Uuid, actor: &Actor) -> Result<(), PatientError> {
        let name = self.db.with_conn(|conn| {
            let name: Option<String> = conn
                .query_row("SELECT name FROM patients WHERE id = ?", params![id], |r| {
                    r.get(0)
                })
                .optional()?;
            if name.is_some() {
                conn.execute("DELETE FROM patients WHERE id = ?", params![id])?;
            }
            Ok(name)
        })?;

        let name = name.ok_or(PatientError::NotFound)?;

        self.activity.record(ActivityEvent {
            entity_type: "patient".to_string(),
            entity_id: id.to_string(),
            action: ActivityAction::Deleted,
            actor_id: actor.id.clone(),
            metadata: json!({ "name": name }),
        });

        Ok(())
    }
}

fn fetch_patient(conn: &Connection, id: Uuid) -> DbResult<Option<Patient>> {
    let mut patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
            params![id],
            patient_from_row,
        )
        .optional()?;

    if let Some(p) = patient.as_mut() {
        p.details = conn
            .query_row(
                &format!("SELECT {DETAIL_COLUMNS} FROM patient_details WHERE patient_id = ?"),
                params![id],
                details_from_row,
            )
            .optional()?;
    }
    Ok(patient)
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        gender: row
            .get::<_, Option<String>>(2)?
            .as_deref()
            .and_then(Gender::from_db),
        age: row.get(3)?,
        address: row.get(4)?,
        contact_number: row.get(5)?,
        disease: row.get(6)?,
        status: PatientStatus::from_db(&row.get::<_, String>(7)?),
        registered_date: row.get(8)?,
        last_visit: row.get(9)?,
        last_visit_time: row.get(10)?,
        next_appointment: row.get(11)?,
        created_by: row.get(12)?,
        details: None,
    })
}

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<PatientDetails> {
    Ok(PatientDetails {
        weight: row.get(0)?,
        height: row.get(1)?,
        bmi: row.get(2)?,
        body_temperature: row.get(3)?,
        heart_rate: row.get(4)?,
        chronic_conditions: json_list(row.get::<_, String>(5)?),
        past_major_illnesses: crate::models::YesNo::from_db(&row.get::<_, String>(6)?),
        past_major_illnesses_detail: row.get(7)?,
        previous_surgeries: crate::models::YesNo::from_db(&row.get::<_, String>(8)?),
        prescription_drugs: json_list(row.get::<_, String>(9)?),
        otc_medications: json_list(row.get::<_, String>(10)?),
        medication_notes: row.get(11)?,
    })
}

fn json_list(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn json_string(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

/// First write of a details row: absent fields take the documented
/// defaults.
fn insert_details(conn: &Connection, id: Uuid, input: &PatientDetailsInput) -> DbResult<()> {
    conn.execute(
        &format!("INSERT INTO patient_details (patient_id, {DETAIL_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
        params![
            id,
            input.weight,
            input.height,
            input.bmi,
            input.body_temperature,
            input.heart_rate,
            json_string(input.chronic_conditions.as_deref().unwrap_or_default()),
            input.past_major_illnesses.unwrap_or_default().as_str(),
            input.past_major_illnesses_detail,
            input.previous_surgeries.unwrap_or_default().as_str(),
            json_string(input.prescription_drugs.as_deref().unwrap_or_default()),
            json_string(input.otc_medications.as_deref().unwrap_or_default()),
            input.medication_notes,
        ],
    )?;
    Ok(())
}

/// Merge-update: absent fields keep their stored values; list fields
/// replace wholesale.
fn upsert_details(conn: &Connection, id: Uuid, input: &PatientDetailsInput) -> DbResult<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM patient_details WHERE patient_id = ?",
        params![id],
        |row| row.get::<_, i64>(0).map(|n| n > 0),
    )?;

    if !exists {
        return insert_details(conn, id, input);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(weight) = input.weight {
        sets.push("weight = ?");
        args.push(Box::new(weight));
    }
    if let Some(height) = input.height {
        sets.push("height = ?");
        args.push(Box::new(height));
    }
    if let Some(bmi) = input.bmi {
        sets.push("bmi = ?");
        args.push(Box::new(bmi));
    }
    if let Some(temp) = input.body_temperature {
        sets.push("body_temperature = ?");
        args.push(Box::new(temp));
    }
    if let Some(rate) = input.heart_rate {
        sets.push("heart_rate = ?");
        args.push(Box::new(rate));
    }
    if let Some(conditions) = &input.chronic_conditions {
        sets.push("chronic_conditions = ?");
        args.push(Box::new(json_string(conditions)));
    }
    if let Some(illnesses) = input.past_major_illnesses {
        sets.push("past_major_illnesses = ?");
        args.push(Box::new(illnesses.as_str()));
    }
    if let Some(detail) = &input.past_major_illnesses_detail {
        sets.push("past_major_illnesses_detail = ?");
        args.push(Box::new(detail.clone()));
    }
    if let Some(surgeries) = input.previous_surgeries {
        sets.push("previous_surgeries = ?");
        args.push(Box::new(surgeries.as_str()));
    }
    if let Some(drugs) = &input.prescription_drugs {
        sets.push("prescription_drugs = ?");
        args.push(Box::new(json_string(drugs)));
    }
    if let Some(otc) = &input.otc_medications {
        sets.push("otc_medications = ?");
        args.push(Box::new(json_string(otc)));
    }
    if let Some(notes) = &input.medication_notes {
        sets.push("medication_notes = ?");
        args.push(Box::new(notes.clone()));
    }

    if sets.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "UPDATE patient_details SET {} WHERE patient_id = ?",
        sets.join(", ")
    );
    let mut refs: Vec<&dyn ToSql> = args.iter().map(|b| b.as_ref()).collect();
    refs.push(&id);
    conn.execute(&sql, refs.as_slice())?;
    Ok(())
}
