//! Database Adapter
//!
//! Bridges the concrete `Database` struct with the `ProfileStore`
//! capability trait the onboarding service is built against.

use std::sync::{Arc, Mutex};

use crate::store::Database;
use crate::types::{IdentityProfile, ProfileStore, ProvisioningRecord, StoreError};

/// Wraps an `Arc<Mutex<Database>>` and implements `ProfileStore`.
pub struct DatabaseAdapter {
    db: Arc<Mutex<Database>>,
}

impl DatabaseAdapter {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

impl ProfileStore for DatabaseAdapter {
    fn create_profile(&self, identity_id: &str) -> Result<(), StoreError> {
        self.db.lock().unwrap().create_profile(identity_id)
    }

    fn get_profile(&self, identity_id: &str) -> Result<Option<IdentityProfile>, StoreError> {
        self.db.lock().unwrap().get_profile(identity_id)
    }

    fn account_number_in_use(&self, account_number: &str) -> Result<bool, StoreError> {
        self.db.lock().unwrap().account_number_in_use(account_number)
    }

    fn commit_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError> {
        self.db.lock().unwrap().commit_provisioning(identity_id, record)
    }

    fn overwrite_provisioning(
        &self,
        identity_id: &str,
        record: &ProvisioningRecord,
    ) -> Result<(), StoreError> {
        self.db.lock().unwrap().overwrite_provisioning(identity_id, record)
    }
}
