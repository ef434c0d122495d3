//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS` and
/// the guarded fallback-category seed.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    color       TEXT NOT NULL,
    is_system   INTEGER NOT NULL DEFAULT 0,
    is_hidden   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS commitments (
    commitment_id   TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    start_date      TEXT NOT NULL,   -- ISO 8601 UTC; the schedule anchor
    cycle           TEXT NOT NULL,   -- JSON-encoded Cycle
    status          TEXT NOT NULL,   -- 'active' | 'paused' | 'archived'
    next_occurrence TEXT NOT NULL,   -- cached; derived from start_date + cycle
    amount          TEXT,            -- decimal string, exact
    currency        TEXT NOT NULL DEFAULT 'other',
    notes           TEXT,
    tags            TEXT NOT NULL DEFAULT '[]',
    category_id     TEXT,            -- weak reference; may dangle
    created_at      TEXT NOT NULL
);

-- The change ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS history (
    commitment_id  TEXT NOT NULL REFERENCES commitments(commitment_id),
    seq            INTEGER NOT NULL,  -- per-commitment insertion order
    at             TEXT NOT NULL,     -- ISO 8601 UTC
    kind           TEXT NOT NULL,     -- discriminant of ChangeKind
    previous_value TEXT,
    new_value      TEXT,
    PRIMARY KEY (commitment_id, seq)
);

CREATE INDEX IF NOT EXISTS commitments_status_idx   ON commitments(status);
CREATE INDEX IF NOT EXISTS commitments_category_idx ON commitments(category_id);
CREATE INDEX IF NOT EXISTS history_kind_idx         ON history(commitment_id, kind);

-- Seed the designated fallback category once.
INSERT INTO categories (category_id, name, color, is_system, is_hidden)
SELECT '00000000-0000-4000-8000-000000000001', 'Other', '#9e9e9e', 1, 0
WHERE NOT EXISTS (SELECT 1 FROM categories WHERE is_system = 1 AND name = 'Other');

PRAGMA user_version = 1;
";
