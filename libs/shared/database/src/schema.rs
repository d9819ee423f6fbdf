/// Schema applied on every open. List-valued detail fields are stored as
/// JSON arrays in TEXT columns.
///
/// The partial unique index on (date, time) is the storage-level guard for
/// the booking invariant: at most one appointment in an active status may
/// hold a slot. Finished appointments (Completed/Cancelled/No_show) fall
/// outside the index and free the slot.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    gender          TEXT,
    age             INTEGER,
    address         TEXT,
    contact_number  TEXT,
    disease         TEXT,
    status          TEXT NOT NULL DEFAULT 'Active',
    registered_date TEXT NOT NULL,
    last_visit      TEXT,
    last_visit_time TEXT,
    next_appointment TEXT,
    created_by      TEXT
);

CREATE TABLE IF NOT EXISTS patient_details (
    patient_id                  TEXT PRIMARY KEY
                                REFERENCES patients(id) ON DELETE CASCADE,
    weight                      REAL,
    height                      REAL,
    bmi                         REAL,
    body_temperature            REAL,
    heart_rate                  INTEGER,
    chronic_conditions          TEXT NOT NULL DEFAULT '[]',
    past_major_illnesses        TEXT NOT NULL DEFAULT 'No',
    past_major_illnesses_detail TEXT,
    previous_surgeries          TEXT NOT NULL DEFAULT 'No',
    prescription_drugs          TEXT NOT NULL DEFAULT '[]',
    otc_medications             TEXT NOT NULL DEFAULT '[]',
    medication_notes            TEXT
);

CREATE TABLE IF NOT EXISTS appointments (
    id               TEXT PRIMARY KEY,
    patient_id       TEXT NOT NULL
                     REFERENCES patients(id) ON DELETE CASCADE,
    appointment_type TEXT NOT NULL,
    session_type     TEXT,
    date             TEXT NOT NULL,
    time             TEXT NOT NULL,
    visit_type       TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'Scheduled',
    reason           TEXT,
    notes            TEXT,
    created_by       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot
    ON appointments(date, time)
    WHERE status IN ('Scheduled', 'Ongoing');

CREATE INDEX IF NOT EXISTS idx_appointments_patient
    ON appointments(patient_id);

CREATE INDEX IF NOT EXISTS idx_appointments_date
    ON appointments(date);

CREATE INDEX IF NOT EXISTS idx_patients_registered
    ON patients(registered_date);
"#;
