//! Database schema definitions for routinely.

/// SQL schema for creating all version 1 tables.
pub const SCHEMA: &str = r#"
-- Routine documents (free-text "my routine", versioned)
CREATE TABLE IF NOT EXISTS routine_documents (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL CHECK (version >= 1),
    status TEXT NOT NULL CHECK (status IN ('draft', 'active', 'past')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

-- Versions are never reused, deleted rows included
CREATE UNIQUE INDEX IF NOT EXISTS idx_routine_documents_owner_version
    ON routine_documents(owner_id, version);

-- At most one live active row and one live draft row per owner
CREATE UNIQUE INDEX IF NOT EXISTS idx_routine_documents_one_active
    ON routine_documents(owner_id) WHERE status = 'active' AND deleted_at IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_routine_documents_one_draft
    ON routine_documents(owner_id) WHERE status = 'draft' AND deleted_at IS NULL;

-- Recurring routine definitions
CREATE TABLE IF NOT EXISTS routine_definitions (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    schedule_type TEXT NOT NULL,
    schedule_config TEXT NOT NULL,
    time_of_day TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_routine_definitions_owner ON routine_definitions(owner_id);

-- Items within a definition
CREATE TABLE IF NOT EXISTS routine_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    definition_id TEXT NOT NULL REFERENCES routine_definitions(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    item_type TEXT NOT NULL DEFAULT '',
    classification TEXT NOT NULL DEFAULT 'neutral',
    duration_minutes REAL,
    sets INTEGER,
    reps INTEGER,
    weight_kg REAL,
    distance_km REAL,
    calories INTEGER,
    is_optional INTEGER NOT NULL DEFAULT 0,
    item_order INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_routine_items_definition ON routine_items(definition_id);
"#;

/// Schema version table
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for migration from v1 to v2 (unregistered sessions and sleep routines)
pub const MIGRATION_V1_TO_V2: &str = r#"
-- Embedded routine array per anonymous session
CREATE TABLE IF NOT EXISTS session_routines (
    session_id TEXT PRIMARY KEY,
    routines_json TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);

-- Sleep routine per owner or session ("owner:<id>" / "session:<id>")
CREATE TABLE IF NOT EXISTS sleep_routines (
    subject_key TEXT PRIMARY KEY,
    bedtime TEXT,
    wake_time TEXT,
    pre_bed_items_json TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);
"#;
