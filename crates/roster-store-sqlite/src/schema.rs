//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Registry ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS roles (
    role_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    automated   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS languages (
    language_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS expertises (
    expertise_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE
);

-- ── Projects and assignments ────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- booking_status and candidate_id are written only by the transition code.
-- candidate_id has no foreign key: automated roles occupy with their role id.
CREATE TABLE IF NOT EXISTS resource_assignments (
    assignment_id      TEXT PRIMARY KEY,
    project_id         TEXT NOT NULL REFERENCES projects(project_id),
    role_id            TEXT NOT NULL REFERENCES roles(role_id),
    required_seniority TEXT NOT NULL,
    booking_status     TEXT NOT NULL DEFAULT 'draft',
    candidate_id       TEXT,
    price_cents        INTEGER,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    CHECK (booking_status IN ('draft', 'searching', 'accepted')),
    CHECK (booking_status =  'accepted' OR candidate_id IS NULL),
    CHECK (booking_status != 'accepted' OR candidate_id IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS assignment_languages (
    assignment_id TEXT NOT NULL REFERENCES resource_assignments(assignment_id),
    language_id   TEXT NOT NULL REFERENCES languages(language_id),
    PRIMARY KEY (assignment_id, language_id)
);

CREATE TABLE IF NOT EXISTS assignment_expertises (
    assignment_id TEXT NOT NULL REFERENCES resource_assignments(assignment_id),
    expertise_id  TEXT NOT NULL REFERENCES expertises(expertise_id),
    PRIMARY KEY (assignment_id, expertise_id)
);

-- One accepted occupation per (project, role, candidate).
CREATE UNIQUE INDEX IF NOT EXISTS assignments_occupancy_idx
    ON resource_assignments(project_id, role_id, candidate_id)
    WHERE booking_status = 'accepted';
CREATE INDEX IF NOT EXISTS assignments_match_idx
    ON resource_assignments(booking_status, role_id, required_seniority);
CREATE INDEX IF NOT EXISTS assignments_candidate_idx
    ON resource_assignments(candidate_id);

-- ── Candidates ──────────────────────────────────────────────────────────────

-- role_id and seniority may be missing or malformed while onboarding is
-- incomplete; such rows simply never match.
CREATE TABLE IF NOT EXISTS candidates (
    candidate_id TEXT PRIMARY KEY,
    role_id      TEXT,
    seniority    TEXT,
    availability TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS candidate_languages (
    candidate_id TEXT NOT NULL REFERENCES candidates(candidate_id) ON DELETE CASCADE,
    language_id  TEXT NOT NULL,
    PRIMARY KEY (candidate_id, language_id)
);

CREATE TABLE IF NOT EXISTS candidate_expertises (
    candidate_id TEXT NOT NULL REFERENCES candidates(candidate_id) ON DELETE CASCADE,
    expertise_id TEXT NOT NULL,
    PRIMARY KEY (candidate_id, expertise_id)
);

CREATE INDEX IF NOT EXISTS candidates_match_idx ON candidates(role_id, seniority);

-- ── Append-only history ─────────────────────────────────────────────────────

-- Rows are never updated or deleted; rowid gives insertion order.
CREATE TABLE IF NOT EXISTS booking_events (
    event_id      TEXT PRIMARY KEY,
    assignment_id TEXT NOT NULL REFERENCES resource_assignments(assignment_id),
    transition    TEXT NOT NULL,
    from_status   TEXT NOT NULL,
    to_status     TEXT NOT NULL,
    candidate_id  TEXT,
    recorded_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS booking_events_assignment_idx ON booking_events(assignment_id);
CREATE INDEX IF NOT EXISTS booking_events_candidate_idx  ON booking_events(candidate_id);

-- ── Fan-out ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS match_notifications (
    notification_id TEXT PRIMARY KEY,
    candidate_id    TEXT NOT NULL,
    assignment_id   TEXT NOT NULL REFERENCES resource_assignments(assignment_id),
    created_at      TEXT NOT NULL,
    delivered_at    TEXT,
    UNIQUE (candidate_id, assignment_id)
);

CREATE INDEX IF NOT EXISTS match_notifications_undelivered_idx
    ON match_notifications(delivered_at);

CREATE TABLE IF NOT EXISTS fanout_jobs (
    job_id        TEXT PRIMARY KEY,
    assignment_id TEXT NOT NULL REFERENCES resource_assignments(assignment_id),
    state         TEXT NOT NULL DEFAULT 'pending',
    attempts      INTEGER NOT NULL DEFAULT 0,
    last_error    TEXT,
    enqueued_at   TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS fanout_jobs_pending_idx ON fanout_jobs(state);

PRAGMA user_version = 1;
";
