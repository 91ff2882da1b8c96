//! SQL schema for the Curate SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS policies (
    policy_id TEXT PRIMARY KEY,
    title     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS objects (
    object_id       TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,   -- ObjectKind, snake_case
    title           TEXT NOT NULL,
    visibility      TEXT NOT NULL,   -- Visibility, lowercase
    admin_policy_id TEXT,
    relations       TEXT NOT NULL DEFAULT '{}'   -- JSON Relations
);

-- One embargo per object. Cleared embargoes keep their row for the history.
CREATE TABLE IF NOT EXISTS embargoes (
    object_id         TEXT PRIMARY KEY REFERENCES objects(object_id) ON DELETE CASCADE,
    visibility_during TEXT,
    visibility_after  TEXT,
    release_date      TEXT,            -- YYYY-MM-DD
    history           TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS authorities (
    authority_id TEXT PRIMARY KEY,
    kind         TEXT NOT NULL,   -- 'person' | 'organization' | 'group' | 'topic'
    label        TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- Reverse index from authority to citing objects, rebuilt per object on
-- every save. No foreign key on authority_id: retired authorities may still
-- be cited until every object is rewritten.
CREATE TABLE IF NOT EXISTS object_references (
    object_id    TEXT NOT NULL REFERENCES objects(object_id) ON DELETE CASCADE,
    relation     TEXT NOT NULL,
    authority_id TEXT NOT NULL,
    PRIMARY KEY (object_id, relation, authority_id)
);

CREATE INDEX IF NOT EXISTS object_references_authority_idx ON object_references(authority_id);
CREATE INDEX IF NOT EXISTS embargoes_release_idx          ON embargoes(release_date);
CREATE INDEX IF NOT EXISTS objects_kind_idx                ON objects(kind);

PRAGMA user_version = 1;
";
