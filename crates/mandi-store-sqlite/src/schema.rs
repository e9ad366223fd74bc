//! SQL schema for the mandi SQLite store.
//!
//! [`PRAGMAS`] run on every open. [`SCHEMA`] runs only while the database's
//! `PRAGMA user_version` is below [`SCHEMA_VERSION`].

/// Version the DDL below leaves in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Per-connection settings.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "

CREATE TABLE IF NOT EXISTS participants (
    participant_id TEXT PRIMARY KEY,
    name           TEXT,
    email          TEXT,
    role           TEXT    NOT NULL DEFAULT 'N',  -- N | C | R | S | SR | D
    app_tier       TEXT    NOT NULL DEFAULT 'v2', -- v1 | v2
    active         INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT    NOT NULL
);

-- At most one fragment per participant. Rows are never deleted.
CREATE TABLE IF NOT EXISTS fragments (
    fragment_id              TEXT PRIMARY KEY,
    participant_id           TEXT    NOT NULL UNIQUE REFERENCES participants(participant_id),
    kind                     TEXT    NOT NULL,  -- 'shop' | 'delivery'
    shop_type                INTEGER,           -- ShopKind code; NULL for delivery
    legal_name               TEXT,
    address                  TEXT,
    contact_number           TEXT,
    identity_document_url    TEXT,
    details_json             TEXT    NOT NULL,  -- kind-specific fields
    approval_status          TEXT,              -- NULL until first submission
    rejection_reason         TEXT,
    application_submitted_at TEXT,
    review_initiated_at      TEXT,
    documents_verified_at    TEXT,
    active                   INTEGER NOT NULL DEFAULT 1,
    created_at               TEXT    NOT NULL
);

-- Subcategory list and derived category set, written together.
CREATE TABLE IF NOT EXISTS memberships (
    participant_id     TEXT PRIMARY KEY REFERENCES participants(participant_id),
    subcategories_json TEXT NOT NULL DEFAULT '[]',
    categories_json    TEXT NOT NULL DEFAULT '[]',
    updated_at         TEXT NOT NULL
);

-- Catalog: subcategory -> parent category.
CREATE TABLE IF NOT EXISTS subcategories (
    subcategory_id INTEGER PRIMARY KEY,
    category_id    INTEGER NOT NULL,
    name           TEXT
);

CREATE INDEX IF NOT EXISTS participants_email_idx  ON participants(email COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS fragments_approval_idx  ON fragments(approval_status);
CREATE INDEX IF NOT EXISTS subcategories_cat_idx   ON subcategories(category_id);

PRAGMA user_version = 1;
";
