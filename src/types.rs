//! ChainBank Core - Type Definitions
//!
//! Shared types for the account provisioning core: the identity profile
//! record, the storage capability trait, the onboarding service surface,
//! and the error taxonomy of both layers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Identity Profile ────────────────────────────────────────────

/// One row of the profile registry.
///
/// The row is created by the registration collaborator with all
/// provisioning fields unset; `complete_onboarding` fills them exactly
/// once. `private_key_commitment` is the only durable trace of the
/// private key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub identity_id: String,
    pub account_number: Option<String>,
    pub public_key: Option<String>,
    pub wallet_address: Option<String>,
    pub private_key_commitment: Option<String>,
    pub provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_at: Option<String>,
    pub created_at: String,
}

impl IdentityProfile {
    /// Whether this profile already carries onboarding data.
    ///
    /// Mirrors the idempotency guard: a profile counts as onboarded when
    /// the flag is set, or when both the account number and the public key
    /// are already present.
    pub fn is_onboarded(&self) -> bool {
        self.provisioned || (self.account_number.is_some() && self.public_key.is_some())
    }
}

/// The field set written in the single atomic provisioning update.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRecord {
    pub account_number: String,
    pub public_key: String,
    pub wallet_address: String,
    pub private_key_commitment: String,
    pub provisioned_at: String,
}

/// Read-only projection of an onboarded profile.
///
/// Never carries the commitment or any key material beyond the public
/// key and derived address.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub account_number: String,
    pub public_key: String,
    pub wallet_address: String,
    pub provisioned_at: String,
}

/// Three-valued onboarding status of an identity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// No profile row exists for this identity.
    Unknown,
    /// The profile exists but has not been onboarded.
    Registered,
    /// Onboarding has completed.
    Onboarded,
}

// ─── One-Time Key Disclosure ─────────────────────────────────────

/// Plaintext private key, disclosed exactly once in the return value of
/// a successful onboarding call.
///
/// Deliberately has no `Serialize`, no `Clone`, and a redacted `Debug`,
/// so there is no path from this value into storage or logs.
pub struct DisclosedPrivateKey(String);

impl DisclosedPrivateKey {
    pub(crate) fn new(private_key_hex: String) -> Self {
        Self(private_key_hex)
    }

    /// Read the hex-encoded private key.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DisclosedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DisclosedPrivateKey(<redacted>)")
    }
}

/// Result of a successful onboarding call.
///
/// This is the single point in the system's lifetime where the plaintext
/// private key is observable; it is never retrievable again.
#[derive(Debug)]
pub struct OnboardingData {
    pub account_number: String,
    pub public_key: String,
    pub wallet_address: String,
    pub private_key: DisclosedPrivateKey,
}

// ─── Errors ──────────────────────────────────────────────────────

/// Storage-layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A profile row already exists for this identity.
    #[error("profile already exists")]
    ProfileExists,
    /// The account number violated the registry-wide uniqueness
    /// constraint.
    #[error("account number already in use")]
    AccountNumberTaken,
    /// The conditional update matched no row: the profile is missing or
    /// was provisioned concurrently.
    #[error("profile missing or provisioned concurrently")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Onboarding failures surfaced to callers.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// No profile row exists for this identity; registration must happen
    /// before onboarding.
    #[error("identity {0} is not registered")]
    UnknownIdentity(String),
    /// The identity has already completed onboarding. Existing data is
    /// never overwritten by `complete_onboarding`.
    #[error("identity has already completed onboarding")]
    AlreadyOnboarded,
    /// No unused account number was found within the retry bound.
    #[error("no unused account number found after {attempts} attempts")]
    AccountNumbersExhausted { attempts: u32 },
    /// The atomic provisioning write failed; nothing was persisted.
    #[error("failed to persist onboarding record: {0}")]
    PersistFailed(#[from] StoreError),
    /// Any other internal failure. Fatal for the call, not retried.
    #[error("unexpected onboarding failure: {0}")]
    Unexpected(#[from] anyhow::Error),
}

// ─── Profile Store ───────────────────────────────────────────────

/// Storage capability the onboarding service is built against.
///
/// Implementations must enforce account-number uniqueness at the storage
/// layer; the allocator's pre-check is only an optimization.
pub trait ProfileStore: Send + Sync {
    /// Create an empty profile row for a newly registered identity.
    fn create_profile(&self, identity_id: &str) -> Result<(), StoreError>;

    fn get_profile(&self, identity_id: &str) -> Result<Option<IdentityProfile>, StoreError>;

    /// Whether any profile currently holds this account number.
    fn account_number_in_use(&self, account_number: &str) -> Result<bool, StoreError>;

    /// Atomically write the full provisioning record, conditioned on the
    /// profile not being provisioned yet.
    ///
    /// Fails with [`StoreError::Conflict`] when the condition does not
    /// hold and [`StoreError::AccountNumberTaken`] when the account
    /// number lost a uniqueness race. Either way no partial write is
    /// observable.
    fn commit_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError>;

    /// Unconditionally replace the provisioning record. Only the
    /// privileged regenerate path uses this.
    fn overwrite_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError>;
}

// ─── Onboarding Service Surface ──────────────────────────────────

/// The operations the surrounding web/auth layer consumes.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// Whether the identity has completed onboarding. Side-effect-free;
    /// returns `false` for unknown identities as well.
    async fn is_onboarded(&self, identity_id: &str) -> Result<bool, OnboardingError>;

    /// Three-valued status distinguishing "no such identity" from
    /// "registered but not onboarded".
    async fn status(&self, identity_id: &str) -> Result<ProfileStatus, OnboardingError>;

    /// Public fields of an onboarded profile, or `None` if the identity
    /// is unknown or not yet onboarded.
    async fn public_data(
        &self,
        identity_id: &str,
    ) -> Result<Option<PublicProfile>, OnboardingError>;

    /// One-time onboarding: assign an account number and key material,
    /// persist the hash commitment, and return the plaintext private key
    /// for the only time ever.
    async fn complete_onboarding(
        &self,
        identity_id: &str,
    ) -> Result<OnboardingData, OnboardingError>;

    /// Operator-initiated recovery: regenerate and overwrite the account
    /// number, key material, and commitment. Privileged; callers must
    /// gate access themselves.
    async fn regenerate_onboarding(
        &self,
        identity_id: &str,
    ) -> Result<OnboardingData, OnboardingError>;
}

// ─── Configuration ───────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainbankConfig {
    pub db_path: String,
    pub log_level: LogLevel,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Default configuration. Fields with no sensible default are left for
/// callers to override.
pub fn default_config() -> ChainbankConfig {
    ChainbankConfig {
        db_path: "~/.chainbank/chainbank.db".to_string(),
        log_level: LogLevel::Info,
        version: "0.1.0".to_string(),
    }
}
