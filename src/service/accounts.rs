use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::password::{CredentialHasher, CredentialVerifier, VerifyOutcome};
use crate::auth::NewAccount;
use crate::db::SessionManager;
use crate::db::models::{DbProfile, DbUser, NewProfile};
use crate::db::queries;
use crate::error::StorefrontError;

/// Account creation and password login on top of the session manager.
#[derive(Clone)]
pub struct AccountService {
    manager: Arc<SessionManager>,
    hasher: CredentialHasher,
    verifier: CredentialVerifier,
}

impl AccountService {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self::with_hasher(manager, CredentialHasher::default())
    }

    pub fn with_hasher(manager: Arc<SessionManager>, hasher: CredentialHasher) -> Self {
        Self {
            manager,
            hasher,
            verifier: CredentialVerifier,
        }
    }

    /// Validate, hash the password and store the new user.
    pub async fn register(&self, account: NewAccount) -> Result<DbUser, StorefrontError> {
        account.validate()?;
        let NewAccount {
            username,
            email,
            password,
        } = account;

        // Argon2 is CPU and memory heavy; keep it off the async workers.
        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| StorefrontError::Hashing(format!("hashing task failed: {e}")))??;

        let user = self
            .manager
            .scoped_session(|session| {
                Box::pin(async move {
                    let conn = session.conn().await?;
                    let id = queries::insert_user(&mut *conn, &username, &email, &password_hash)
                        .await?;
                    let user = queries::user_by_id(conn, id).await?;
                    session.commit().await?;
                    Ok::<_, StorefrontError>(user)
                })
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "account registered");
        Ok(user)
    }

    /// Return the user only when `password` matches the stored credential.
    /// Every other case is `AuthenticationDenied`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DbUser, StorefrontError> {
        let lookup = username.to_string();
        let user = self
            .manager
            .scoped_session(|session| {
                Box::pin(async move {
                    let conn = session.conn().await?;
                    queries::user_by_username(conn, &lookup).await
                })
            })
            .await?;

        let Some(user) = user else {
            debug!(username, "login for unknown user");
            return Err(StorefrontError::AuthenticationDenied);
        };
        if user.disabled {
            debug!(user_id = user.id, "login for disabled user");
            return Err(StorefrontError::AuthenticationDenied);
        }

        let verifier = self.verifier;
        let stored = user.password.clone();
        let candidate = password.to_string();
        let outcome = tokio::task::spawn_blocking(move || verifier.verify(&stored, &candidate))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "verification task failed");
                VerifyOutcome::VerifierFailure
            });

        match outcome {
            VerifyOutcome::Match => Ok(user),
            VerifyOutcome::Mismatch => {
                debug!(user_id = user.id, "password mismatch");
                Err(StorefrontError::AuthenticationDenied)
            }
            VerifyOutcome::Malformed => {
                warn!(user_id = user.id, "stored credential is malformed");
                Err(StorefrontError::AuthenticationDenied)
            }
            VerifyOutcome::VerifierFailure => {
                error!(user_id = user.id, "credential verifier failed");
                Err(StorefrontError::AuthenticationDenied)
            }
        }
    }

    pub async fn create_profile(
        &self,
        user_id: i64,
        profile: NewProfile,
    ) -> Result<DbProfile, StorefrontError> {
        self.manager
            .scoped_session(|session| {
                Box::pin(async move {
                    let conn = session.conn().await?;
                    let profile = queries::insert_profile(conn, user_id, &profile).await?;
                    session.commit().await?;
                    Ok(profile)
                })
            })
            .await
    }

    pub async fn profile_for_user(&self, user_id: i64) -> Result<Option<DbProfile>, StorefrontError> {
        self.manager
            .scoped_session(|session| {
                Box::pin(async move {
                    let conn = session.conn().await?;
                    queries::profile_for_user(conn, user_id).await
                })
            })
            .await
    }
}
