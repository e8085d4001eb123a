//! Onboarding Service
//!
//! Composes the account number allocator, the key material generator,
//! and the commitment hasher into the one-time onboarding operation
//! against the profile registry.
//!
//! The flow for a fresh identity:
//!
//! 1. Guard: refuse if the profile is missing or already onboarded
//! 2. Generate a key pair and the commitment of its private key
//! 3. Allocate an unused account number
//! 4. Persist everything in one conditional atomic update
//! 5. Return the plaintext private key, for the only time ever

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::types::{
    OnboardingApi, OnboardingData, OnboardingError, ProfileStatus, ProfileStore, ProvisioningRecord,
    PublicProfile, StoreError,
};

use super::account::{allocate_account_number, MAX_ALLOCATION_ATTEMPTS};
use super::commitment::commit_private_key;
use super::keys::{generate_keypair, KeyMaterial};

/// The provisioning orchestrator consumed by the web/auth layer.
pub struct OnboardingService {
    store: Box<dyn ProfileStore>,
}

impl OnboardingService {
    pub fn new(store: Box<dyn ProfileStore>) -> Self {
        Self { store }
    }

    fn read_status(&self, identity_id: &str) -> Result<ProfileStatus, OnboardingError> {
        match self.store.get_profile(identity_id)? {
            None => Ok(ProfileStatus::Unknown),
            Some(profile) if profile.is_onboarded() => Ok(ProfileStatus::Onboarded),
            Some(_) => Ok(ProfileStatus::Registered),
        }
    }

    fn read_public_data(
        &self,
        identity_id: &str,
    ) -> Result<Option<PublicProfile>, OnboardingError> {
        let Some(profile) = self.store.get_profile(identity_id)? else {
            return Ok(None);
        };
        if !profile.is_onboarded() {
            return Ok(None);
        }

        let public = match (
            profile.account_number,
            profile.public_key,
            profile.wallet_address,
            profile.provisioned_at,
        ) {
            (Some(account_number), Some(public_key), Some(wallet_address), Some(provisioned_at)) => {
                Some(PublicProfile {
                    account_number,
                    public_key,
                    wallet_address,
                    provisioned_at,
                })
            }
            _ => None,
        };
        Ok(public)
    }

    /// Shared body of `complete_onboarding` and `regenerate_onboarding`.
    ///
    /// With `overwrite` set, the already-onboarded guard is bypassed and
    /// the write replaces the committed fields unconditionally.
    fn run_onboarding(
        &self,
        identity_id: &str,
        overwrite: bool,
    ) -> Result<OnboardingData, OnboardingError> {
        match self.read_status(identity_id)? {
            ProfileStatus::Unknown => {
                return Err(OnboardingError::UnknownIdentity(identity_id.to_string()));
            }
            ProfileStatus::Onboarded if !overwrite => {
                debug!("Identity {identity_id} is already onboarded, nothing to do");
                return Err(OnboardingError::AlreadyOnboarded);
            }
            _ => {}
        }

        let KeyMaterial {
            public_key,
            wallet_address,
            private_key,
        } = generate_keypair();
        let commitment = commit_private_key(private_key.expose());
        debug!("Generated key material for {identity_id}, commitment {commitment}");

        // The allocator's probe is only a pre-check; the registry's
        // uniqueness constraint arbitrates at commit time. A lost race
        // redraws, bounded.
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let account_number = allocate_account_number(self.store.as_ref())?;

            let record = ProvisioningRecord {
                account_number: account_number.clone(),
                public_key: public_key.clone(),
                wallet_address: wallet_address.clone(),
                private_key_commitment: commitment.clone(),
                provisioned_at: Utc::now().to_rfc3339(),
            };

            let write = if overwrite {
                self.store.overwrite_provisioning(identity_id, &record)
            } else {
                self.store.commit_provisioning(identity_id, &record)
            };

            match write {
                Ok(()) => {
                    info!(
                        "Onboarding committed for {identity_id}: account {account_number}, commitment {commitment}"
                    );
                    return Ok(OnboardingData {
                        account_number,
                        public_key,
                        wallet_address,
                        private_key,
                    });
                }
                Err(StoreError::AccountNumberTaken) => {
                    warn!("Account number {account_number} lost a uniqueness race, redrawing");
                    continue;
                }
                Err(StoreError::Conflict) => {
                    // Zero rows matched the conditional update: a
                    // concurrent caller won, or the row is gone.
                    return match self.read_status(identity_id)? {
                        ProfileStatus::Onboarded if !overwrite => {
                            Err(OnboardingError::AlreadyOnboarded)
                        }
                        ProfileStatus::Unknown => {
                            Err(OnboardingError::UnknownIdentity(identity_id.to_string()))
                        }
                        _ => Err(OnboardingError::PersistFailed(StoreError::Conflict)),
                    };
                }
                Err(e) => return Err(OnboardingError::PersistFailed(e)),
            }
        }

        Err(OnboardingError::AccountNumbersExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}

#[async_trait]
impl OnboardingApi for OnboardingService {
    async fn is_onboarded(&self, identity_id: &str) -> Result<bool, OnboardingError> {
        Ok(self.read_status(identity_id)? == ProfileStatus::Onboarded)
    }

    async fn status(&self, identity_id: &str) -> Result<ProfileStatus, OnboardingError> {
        self.read_status(identity_id)
    }

    async fn public_data(
        &self,
        identity_id: &str,
    ) -> Result<Option<PublicProfile>, OnboardingError> {
        self.read_public_data(identity_id)
    }

    async fn complete_onboarding(
        &self,
        identity_id: &str,
    ) -> Result<OnboardingData, OnboardingError> {
        self.run_onboarding(identity_id, false)
    }

    async fn regenerate_onboarding(
        &self,
        identity_id: &str,
    ) -> Result<OnboardingData, OnboardingError> {
        warn!("Regenerating onboarding for {identity_id}: prior key material becomes unusable");
        self.run_onboarding(identity_id, true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::onboarding::account::is_valid_account_number;
    use crate::onboarding::keys::is_valid_wallet_address;
    use crate::store::{Database, DatabaseAdapter};
    use crate::types::IdentityProfile;

    fn service_with_db() -> (OnboardingService, Arc<Mutex<Database>>) {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let service = OnboardingService::new(Box::new(DatabaseAdapter::new(db.clone())));
        (service, db)
    }

    fn register(db: &Arc<Mutex<Database>>, identity_id: &str) {
        db.lock().unwrap().create_profile(identity_id).unwrap();
    }

    fn stored_profile(db: &Arc<Mutex<Database>>, identity_id: &str) -> IdentityProfile {
        db.lock().unwrap().get_profile(identity_id).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_fresh_onboarding() {
        let (service, db) = service_with_db();
        register(&db, "u1");

        assert!(!service.is_onboarded("u1").await.unwrap());
        assert_eq!(
            service.status("u1").await.unwrap(),
            ProfileStatus::Registered
        );

        let data = service.complete_onboarding("u1").await.unwrap();
        assert!(is_valid_account_number(&data.account_number));
        assert!(data.public_key.starts_with("0x04"));
        assert!(is_valid_wallet_address(&data.wallet_address));
        assert_eq!(data.private_key.expose().len(), 66);

        assert!(service.is_onboarded("u1").await.unwrap());
        assert_eq!(service.status("u1").await.unwrap(), ProfileStatus::Onboarded);

        let profile = stored_profile(&db, "u1");
        assert_eq!(profile.account_number.as_deref(), Some(data.account_number.as_str()));
        assert_eq!(profile.public_key.as_deref(), Some(data.public_key.as_str()));
        assert_eq!(
            profile.wallet_address.as_deref(),
            Some(data.wallet_address.as_str())
        );
        assert!(profile.provisioned_at.is_some());
    }

    #[tokio::test]
    async fn test_stored_commitment_matches_disclosed_key() {
        let (service, db) = service_with_db();
        register(&db, "u1");

        let data = service.complete_onboarding("u1").await.unwrap();
        let recomputed = commit_private_key(data.private_key.expose());

        let profile = stored_profile(&db, "u1");
        assert_eq!(
            profile.private_key_commitment.as_deref(),
            Some(recomputed.as_str())
        );
        // The plaintext key itself is never among the stored fields.
        assert_ne!(
            profile.private_key_commitment.as_deref(),
            Some(data.private_key.expose())
        );
    }

    #[tokio::test]
    async fn test_second_onboarding_is_rejected_and_changes_nothing() {
        let (service, db) = service_with_db();
        register(&db, "u1");

        service.complete_onboarding("u1").await.unwrap();
        let before = stored_profile(&db, "u1");

        let err = service.complete_onboarding("u1").await.unwrap_err();
        assert!(matches!(err, OnboardingError::AlreadyOnboarded));

        let after = stored_profile(&db, "u1");
        assert_eq!(before.account_number, after.account_number);
        assert_eq!(before.public_key, after.public_key);
        assert_eq!(before.private_key_commitment, after.private_key_commitment);
        assert_eq!(before.provisioned_at, after.provisioned_at);
    }

    #[tokio::test]
    async fn test_unknown_identity_is_rejected() {
        let (service, _db) = service_with_db();

        let err = service.complete_onboarding("ghost").await.unwrap_err();
        assert!(matches!(err, OnboardingError::UnknownIdentity(_)));

        assert_eq!(service.status("ghost").await.unwrap(), ProfileStatus::Unknown);
        assert!(!service.is_onboarded("ghost").await.unwrap());
        assert!(service.public_data("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_numbers_are_unique_across_identities() {
        let (service, db) = service_with_db();

        let mut numbers = std::collections::HashSet::new();
        for i in 0..20 {
            let id = format!("u{i}");
            register(&db, &id);
            let data = service.complete_onboarding(&id).await.unwrap();
            assert!(numbers.insert(data.account_number));
        }
    }

    #[tokio::test]
    async fn test_public_data_exposes_only_public_fields() {
        let (service, db) = service_with_db();
        register(&db, "u1");

        assert!(service.public_data("u1").await.unwrap().is_none());

        let data = service.complete_onboarding("u1").await.unwrap();
        let public = service.public_data("u1").await.unwrap().unwrap();

        assert_eq!(public.account_number, data.account_number);
        assert_eq!(public.public_key, data.public_key);
        assert_eq!(public.wallet_address, data.wallet_address);

        // Serialized projection carries neither the commitment nor any
        // private key material.
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("commitment"));
        assert!(!json.contains(data.private_key.expose()));
    }

    #[tokio::test]
    async fn test_regenerate_overwrites_committed_fields() {
        let (service, db) = service_with_db();
        register(&db, "u1");

        service.complete_onboarding("u1").await.unwrap();
        let before = stored_profile(&db, "u1");

        let data = service.regenerate_onboarding("u1").await.unwrap();
        let after = stored_profile(&db, "u1");

        assert!(after.provisioned);
        assert_eq!(after.account_number.as_deref(), Some(data.account_number.as_str()));
        assert_ne!(before.private_key_commitment, after.private_key_commitment);
        assert_eq!(
            after.private_key_commitment.as_deref(),
            Some(commit_private_key(data.private_key.expose()).as_str())
        );
    }

    #[tokio::test]
    async fn test_regenerate_unknown_identity_is_rejected() {
        let (service, _db) = service_with_db();
        let err = service.regenerate_onboarding("ghost").await.unwrap_err();
        assert!(matches!(err, OnboardingError::UnknownIdentity(_)));
    }

    #[tokio::test]
    async fn test_concurrent_onboarding_has_exactly_one_winner() {
        let (service, db) = service_with_db();
        register(&db, "u2");

        let service = Arc::new(service);
        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.complete_onboarding("u2").await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.complete_onboarding("u2").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
        assert_eq!(winners.len(), 1);
        for result in &results {
            if let Err(e) = result {
                assert!(matches!(e, OnboardingError::AlreadyOnboarded));
            }
        }

        // The stored fields belong to the winner.
        let winner = results.iter().flatten().next().unwrap();
        let profile = stored_profile(&db, "u2");
        assert_eq!(
            profile.account_number.as_deref(),
            Some(winner.account_number.as_str())
        );
        assert_eq!(profile.public_key.as_deref(), Some(winner.public_key.as_str()));
    }

    // ─── Failure Injection ───────────────────────────────────────

    /// Store whose provisioning write always fails after the reads have
    /// succeeded.
    struct FailingCommitStore {
        inner: DatabaseAdapter,
    }

    impl ProfileStore for FailingCommitStore {
        fn create_profile(&self, identity_id: &str) -> Result<(), StoreError> {
            self.inner.create_profile(identity_id)
        }

        fn get_profile(&self, identity_id: &str) -> Result<Option<IdentityProfile>, StoreError> {
            self.inner.get_profile(identity_id)
        }

        fn account_number_in_use(&self, account_number: &str) -> Result<bool, StoreError> {
            self.inner.account_number_in_use(account_number)
        }

        fn commit_provisioning(
            &self,
            _identity_id: &str,
            _record: &ProvisioningRecord,
        ) -> Result<(), StoreError> {
            Err(StoreError::Database(rusqlite::Error::QueryReturnedNoRows))
        }

        fn overwrite_provisioning(
            &self,
            _identity_id: &str,
            _record: &ProvisioningRecord,
        ) -> Result<(), StoreError> {
            Err(StoreError::Database(rusqlite::Error::QueryReturnedNoRows))
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_write() {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        register(&db, "u1");

        let service = OnboardingService::new(Box::new(FailingCommitStore {
            inner: DatabaseAdapter::new(db.clone()),
        }));

        let err = service.complete_onboarding("u1").await.unwrap_err();
        assert!(matches!(err, OnboardingError::PersistFailed(_)));

        // Nothing was written: the profile is exactly as registered.
        let profile = stored_profile(&db, "u1");
        assert!(!profile.provisioned);
        assert!(profile.account_number.is_none());
        assert!(profile.public_key.is_none());
        assert!(profile.wallet_address.is_none());
        assert!(profile.private_key_commitment.is_none());
        assert!(profile.provisioned_at.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_allocation_performs_no_write() {
        struct SaturatedStore {
            inner: DatabaseAdapter,
        }

        impl ProfileStore for SaturatedStore {
            fn create_profile(&self, identity_id: &str) -> Result<(), StoreError> {
                self.inner.create_profile(identity_id)
            }

            fn get_profile(
                &self,
                identity_id: &str,
            ) -> Result<Option<IdentityProfile>, StoreError> {
                self.inner.get_profile(identity_id)
            }

            fn account_number_in_use(&self, _account_number: &str) -> Result<bool, StoreError> {
                Ok(true)
            }

            fn commit_provisioning(
                &self,
                _identity_id: &str,
                _record: &ProvisioningRecord,
            ) -> Result<(), StoreError> {
                panic!("no write may happen when allocation is exhausted");
            }

            fn overwrite_provisioning(
                &self,
                _identity_id: &str,
                _record: &ProvisioningRecord,
            ) -> Result<(), StoreError> {
                panic!("no write may happen when allocation is exhausted");
            }
        }

        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        register(&db, "u1");

        let service = OnboardingService::new(Box::new(SaturatedStore {
            inner: DatabaseAdapter::new(db.clone()),
        }));

        let err = service.complete_onboarding("u1").await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::AccountNumbersExhausted { attempts: MAX_ALLOCATION_ATTEMPTS }
        ));

        let profile = stored_profile(&db, "u1");
        assert!(!profile.provisioned);
        assert!(profile.account_number.is_none());
    }
}
