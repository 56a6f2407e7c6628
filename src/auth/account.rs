use serde::Deserialize;

use crate::auth::password::MAX_SECRET_LEN;
use crate::error::StorefrontError;

/// Sign-up payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub fn validate(&self) -> Result<(), StorefrontError> {
        let username_len = self.username.chars().count();
        if !(3..=50).contains(&username_len) {
            return Err(StorefrontError::Validation(
                "username must be between 3 and 50 characters".to_string(),
            ));
        }

        let email_len = self.email.chars().count();
        if !(3..=128).contains(&email_len) || !self.email.contains('@') {
            return Err(StorefrontError::Validation(
                "email must be a valid address of 3 to 128 characters".to_string(),
            ));
        }

        if self.password.is_empty() {
            return Err(StorefrontError::EmptySecret);
        }
        if self.password.len() > MAX_SECRET_LEN {
            return Err(StorefrontError::SecretTooLong {
                max: MAX_SECRET_LEN,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, email: &str, password: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_account() {
        assert!(account("alice", "alice@example.com", "pw").validate().is_ok());
    }

    #[test]
    fn rejects_short_username() {
        assert!(matches!(
            account("al", "alice@example.com", "pw").validate(),
            Err(StorefrontError::Validation(_))
        ));
    }

    #[test]
    fn rejects_email_without_at() {
        assert!(matches!(
            account("alice", "alice.example.com", "pw").validate(),
            Err(StorefrontError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_password() {
        assert!(matches!(
            account("alice", "alice@example.com", "").validate(),
            Err(StorefrontError::EmptySecret)
        ));
    }
}
