//! ChainBank Core -- Account Provisioning Service
//!
//! The backend core of the ChainBank client. Assigns each registered
//! identity an immutable account number and a signing key pair. The
//! private key is disclosed exactly once; only a hash commitment of it
//! is ever stored.

pub mod types;
pub mod config;
pub mod onboarding;
pub mod store;
