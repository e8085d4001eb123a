//! ChainBank Onboarding
//!
//! The one-time provisioning flow: a unique account number, a fresh key
//! pair, and a hash commitment of the private key, committed atomically
//! and disclosed to the caller exactly once.

pub mod account;
pub mod commitment;
pub mod keys;
pub mod service;

pub use service::OnboardingService;
