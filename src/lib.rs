pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod service;

pub use auth::{CredentialHasher, CredentialVerifier, VerifyOutcome};
pub use db::SessionManager;
pub use error::StorefrontError;
