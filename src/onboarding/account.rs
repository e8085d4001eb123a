//! Account Number Allocation
//!
//! Generates the 12-digit human-facing account identifier and allocates
//! an unused one against the profile registry with a bounded retry.

use rand::Rng;
use regex::Regex;
use tracing::{debug, warn};

use crate::types::{OnboardingError, ProfileStore};

/// How many candidate draws the allocator probes before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 10;

/// Inclusive range of valid account numbers: 12 decimal digits with a
/// non-zero first digit.
const ACCOUNT_NUMBER_MIN: u64 = 100_000_000_000;
const ACCOUNT_NUMBER_MAX: u64 = 999_999_999_999;

/// Draw a random 12-digit account number, uniformly.
pub fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX).to_string()
}

/// Validate the account number format: exactly 12 decimal digits.
pub fn is_valid_account_number(value: &str) -> bool {
    Regex::new(r"^\d{12}$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Allocate an account number not currently held by any profile.
///
/// Draws fresh candidates and probes the registry, up to
/// [`MAX_ALLOCATION_ATTEMPTS`] times. The probe is an optimization; the
/// registry's uniqueness constraint remains the source of truth at
/// commit time. A registry read failure aborts the allocation rather
/// than consuming attempts.
pub fn allocate_account_number(store: &dyn ProfileStore) -> Result<String, OnboardingError> {
    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let candidate = generate_account_number();
        if store.account_number_in_use(&candidate)? {
            debug!("Account number collision on attempt {attempt}, redrawing");
            continue;
        }
        debug!("Allocated candidate account number on attempt {attempt}");
        return Ok(candidate);
    }

    warn!(
        "No unused account number found after {} attempts",
        MAX_ALLOCATION_ATTEMPTS
    );
    Err(OnboardingError::AccountNumbersExhausted {
        attempts: MAX_ALLOCATION_ATTEMPTS,
    })
}
