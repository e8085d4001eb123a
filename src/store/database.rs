//! Profile Registry Database
//!
//! SQLite-backed persistence for identity profiles.
//! Uses rusqlite for synchronous, single-process access.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::types::{IdentityProfile, ProvisioningRecord, StoreError};

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};

/// Upper bound on how long a single persistence call may wait on a
/// locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The profile registry's SQLite database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `db_path`, apply the schema, and
    /// return the handle.
    pub fn open(db_path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create db directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database: {db_path}"))?;

        // Enable WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;

        let current_version: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                params![SCHEMA_VERSION],
            )
            .context("failed to update schema version")?;
        }

        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            params![SCHEMA_VERSION],
        )?;
        Ok(Self { conn })
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Insert an empty profile row for a newly registered identity.
    pub fn create_profile(&self, identity_id: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        match self.conn.execute(
            "INSERT INTO profiles (identity_id, created_at) VALUES (?1, ?2)",
            params![identity_id, now],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::ProfileExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_profile(&self, identity_id: &str) -> Result<Option<IdentityProfile>, StoreError> {
        let result = self
            .conn
            .query_row(
                "SELECT identity_id, account_number, public_key, wallet_address,
                        private_key_commitment, provisioned, provisioned_at, created_at
                 FROM profiles WHERE identity_id = ?1",
                params![identity_id],
                |row| {
                    Ok(IdentityProfile {
                        identity_id: row.get(0)?,
                        account_number: row.get(1)?,
                        public_key: row.get(2)?,
                        wallet_address: row.get(3)?,
                        private_key_commitment: row.get(4)?,
                        provisioned: row.get::<_, i64>(5)? != 0,
                        provisioned_at: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    pub fn account_number_in_use(&self, account_number: &str) -> Result<bool, StoreError> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM profiles WHERE account_number = ?1",
                params![account_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    // ─── Provisioning Writes ─────────────────────────────────────

    /// Single atomic update of all provisioning fields, conditioned on
    /// the profile not being provisioned yet.
    pub fn commit_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE profiles
                 SET account_number = ?1, public_key = ?2, wallet_address = ?3,
                     private_key_commitment = ?4, provisioned = 1, provisioned_at = ?5
                 WHERE identity_id = ?6 AND provisioned = 0",
                params![
                    record.account_number,
                    record.public_key,
                    record.wallet_address,
                    record.private_key_commitment,
                    record.provisioned_at,
                    identity_id,
                ],
            )
            .map_err(map_unique_violation)?;

        if changed == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    /// Unconditional replacement of the provisioning fields. Still
    /// subject to the account-number uniqueness constraint.
    pub fn overwrite_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE profiles
                 SET account_number = ?1, public_key = ?2, wallet_address = ?3,
                     private_key_commitment = ?4, provisioned = 1, provisioned_at = ?5
                 WHERE identity_id = ?6",
                params![
                    record.account_number,
                    record.public_key,
                    record.wallet_address,
                    record.private_key_commitment,
                    record.provisioned_at,
                    identity_id,
                ],
            )
            .map_err(map_unique_violation)?;

        if changed == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    // ─── Close ───────────────────────────────────────────────────

    /// Explicitly close the database connection.
    /// This is also handled automatically when the `Database` is dropped,
    /// but calling this method allows you to handle any close errors.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow::anyhow!("failed to close database: {e}"))?;
        Ok(())
    }
}

/// Map a unique-constraint violation on `account_number` to its own
/// error so callers can treat it as a retryable allocation collision.
fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::AccountNumberTaken
        }
        other => StoreError::Database(other),
    }
}
