//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_digest TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES accounts(user_id),
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    user_id                        TEXT PRIMARY KEY,
    contact_name                   TEXT NOT NULL,
    contact_phone_number           TEXT NOT NULL,
    emergency_contact_name         TEXT NOT NULL,
    emergency_contact_phone_number TEXT NOT NULL,
    medical_information            TEXT,
    student_number                 TEXT,
    user_type                      TEXT NOT NULL   -- 'student' | 'admin'
);

-- Content columns are written once. Only status/status_rank are updated,
-- and only upward.
CREATE TABLE IF NOT EXISTS incident_reports (
    id                   TEXT PRIMARY KEY,
    incident_type        TEXT NOT NULL,
    location_details     TEXT NOT NULL,
    detailed_description TEXT NOT NULL,
    report_date_time     TEXT NOT NULL,   -- RFC 3339 UTC
    user_id              TEXT NOT NULL,
    user_name            TEXT NOT NULL,
    student_number       TEXT NOT NULL,
    media_urls           TEXT NOT NULL DEFAULT '[]',
    status               TEXT NOT NULL,   -- 'New' | 'Acknowledged' | 'Resolved'
    status_rank          INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);
CREATE INDEX IF NOT EXISTS reports_user_idx  ON incident_reports(user_id);

PRAGMA user_version = 1;
";
