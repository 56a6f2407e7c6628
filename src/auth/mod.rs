//! Credential handling and account validation.

pub mod account;
pub mod password;

pub use account::NewAccount;
pub use password::{CredentialHasher, CredentialVerifier, VerifyOutcome};
