//! Profile Registry Schema
//!
//! SQL schema for the profile registry. The `UNIQUE` constraint on
//! `account_number` is the storage-layer source of truth for
//! registry-wide uniqueness; the allocator's pre-check is only an
//! optimization on top of it.

pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    identity_id TEXT PRIMARY KEY,
    account_number TEXT UNIQUE,
    public_key TEXT,
    wallet_address TEXT,
    private_key_commitment TEXT,
    provisioned INTEGER NOT NULL DEFAULT 0,
    provisioned_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;
