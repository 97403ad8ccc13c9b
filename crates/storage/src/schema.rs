// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema DDL for the Durable Store. Applied once per connection via
//! `CREATE TABLE IF NOT EXISTS`; there is no migration framework because the
//! schema has exactly one version.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id              TEXT PRIMARY KEY,
    slot            INTEGER NOT NULL,
    working_dir     TEXT NOT NULL,
    command         TEXT NOT NULL,
    pid             INTEGER,
    status          TEXT NOT NULL CHECK (status IN ('idle','running','waiting_checkpoint','completed','failed')),
    started_at      INTEGER NOT NULL,
    ended_at        INTEGER,
    last_polled_at  INTEGER NOT NULL,
    orphaned        INTEGER NOT NULL DEFAULT 0,
    usage_json      TEXT
);

CREATE TABLE IF NOT EXISTS output_chunks (
    rowid_pk    INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    at          INTEGER NOT NULL,
    stream      TEXT NOT NULL CHECK (stream IN ('stdout','stderr')),
    bytes       BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_output_chunks_session ON output_chunks(session_id, at);

CREATE TABLE IF NOT EXISTS worker_messages (
    id                  TEXT PRIMARY KEY,
    session_id          TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    message_type        TEXT NOT NULL,
    payload             TEXT NOT NULL,
    status              TEXT NOT NULL CHECK (status IN ('pending','responded','expired')),
    created_at          INTEGER NOT NULL,
    responded_at        INTEGER,
    response_payload    TEXT
);
CREATE INDEX IF NOT EXISTS idx_worker_messages_session ON worker_messages(session_id);
CREATE INDEX IF NOT EXISTS idx_worker_messages_pending ON worker_messages(session_id, created_at)
    WHERE status = 'pending';

CREATE TABLE IF NOT EXISTS orchestrator_messages (
    id              TEXT PRIMARY KEY,
    session_id      TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    message_type    TEXT NOT NULL,
    payload         TEXT NOT NULL,
    in_response_to  TEXT REFERENCES worker_messages(id),
    created_at      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_orchestrator_messages_in_response_to ON orchestrator_messages(in_response_to);

CREATE TABLE IF NOT EXISTS plans (
    id              TEXT PRIMARY KEY,
    project         TEXT NOT NULL,
    phase           INTEGER NOT NULL,
    plan_number     INTEGER NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('planned','executing','executed','verified')),
    depends_on      TEXT NOT NULL,
    files_written   TEXT NOT NULL,
    files_read      TEXT NOT NULL,
    autonomous      INTEGER NOT NULL,
    verification    TEXT NOT NULL,
    UNIQUE(project, phase, plan_number)
);
CREATE INDEX IF NOT EXISTS idx_plans_project_phase_plan ON plans(project, phase, plan_number);

CREATE TABLE IF NOT EXISTS project_execution_state (
    project                 TEXT PRIMARY KEY,
    highest_executed        INTEGER NOT NULL,
    highest_verified        INTEGER NOT NULL,
    pending_verify_phase    INTEGER,
    most_advanced_phase     INTEGER,
    most_advanced_plan      INTEGER
);

CREATE TABLE IF NOT EXISTS active_files (
    path        TEXT NOT NULL,
    session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    plan_id     TEXT NOT NULL,
    mode        TEXT NOT NULL CHECK (mode IN ('read','write')),
    started_at  INTEGER NOT NULL,
    PRIMARY KEY (path, session_id)
);
CREATE INDEX IF NOT EXISTS idx_active_files_path ON active_files(path);
"#;

pub fn apply(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)
}
