//! Salted, memory-hard password hashing (Argon2id) and verification.
//!
//! Stored values are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`),
//! so verification reads algorithm, version, cost parameters and salt from
//! the stored value itself and never from local configuration.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::error::StorefrontError;

/// Bytes of fresh randomness drawn for every hash.
pub const SALT_LEN: usize = 16;

/// Longest plaintext accepted, in bytes.
pub const MAX_SECRET_LEN: usize = 1024;

/// Highest memory cost (KiB) a stored hash may ask the verifier to spend.
pub const MAX_M_COST: u32 = 256 * 1024;

/// Highest iteration count a stored hash may ask for.
pub const MAX_T_COST: u32 = 16;

/// Highest lane count a stored hash may ask for.
pub const MAX_P_COST: u32 = 16;

/// Result of checking a candidate secret against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The candidate reproduces the stored digest.
    Match,
    /// Well-formed stored hash, different digest.
    Mismatch,
    /// The stored value is not a usable Argon2 PHC string.
    Malformed,
    /// The hashing routine failed, or the stored hash asks for more work
    /// than the verifier is allowed to spend.
    VerifierFailure,
}

impl VerifyOutcome {
    pub fn is_match(self) -> bool {
        matches!(self, VerifyOutcome::Match)
    }
}

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Argon2id v19 with custom cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash `plaintext` under a newly generated salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, StorefrontError> {
        check_secret(plaintext)?;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| StorefrontError::Hashing(e.to_string()))?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| StorefrontError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }
}

fn check_secret(plaintext: &str) -> Result<(), StorefrontError> {
    if plaintext.is_empty() {
        return Err(StorefrontError::EmptySecret);
    }
    if plaintext.len() > MAX_SECRET_LEN {
        return Err(StorefrontError::SecretTooLong {
            max: MAX_SECRET_LEN,
        });
    }
    Ok(())
}

/// Checks candidates against stored hashes. Never returns an error: every
/// failure is one of the [`VerifyOutcome`] variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialVerifier;

impl CredentialVerifier {
    pub fn verify(&self, stored_hash: &str, candidate: &str) -> VerifyOutcome {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored credential is not a PHC string");
                return VerifyOutcome::Malformed;
            }
        };
        let recipe = match HashRecipe::from_phc(&parsed) {
            Ok(recipe) => recipe,
            Err(outcome) => return outcome,
        };

        if candidate.len() > MAX_SECRET_LEN {
            return VerifyOutcome::Mismatch;
        }

        let mut output = vec![0u8; recipe.expected.len()];
        if let Err(e) = recipe
            .argon2
            .hash_password_into(candidate.as_bytes(), &recipe.salt, &mut output)
        {
            error!(error = %e, "credential verification routine failed");
            return VerifyOutcome::VerifierFailure;
        }

        if bool::from(output.as_slice().ct_eq(recipe.expected.as_slice())) {
            VerifyOutcome::Match
        } else {
            VerifyOutcome::Mismatch
        }
    }
}

/// Everything needed to recompute a stored digest.
struct HashRecipe {
    argon2: Argon2<'static>,
    salt: Vec<u8>,
    expected: Vec<u8>,
}

impl HashRecipe {
    /// Rejects unusable stored values as `Malformed` and cost parameters past
    /// the local ceilings as `VerifierFailure`.
    fn from_phc(parsed: &PasswordHash<'_>) -> Result<Self, VerifyOutcome> {
        let algorithm = Algorithm::try_from(parsed.algorithm)
            .inspect_err(|e| warn!(error = %e, "stored credential uses a foreign algorithm"))
            .map_err(|_| VerifyOutcome::Malformed)?;
        let version = match parsed.version {
            Some(v) => Version::try_from(v)
                .inspect_err(|e| warn!(error = %e, "stored credential has unknown version"))
                .map_err(|_| VerifyOutcome::Malformed)?,
            None => Version::default(),
        };
        let params = Params::try_from(parsed)
            .inspect_err(|e| warn!(error = %e, "stored credential has invalid parameters"))
            .map_err(|_| VerifyOutcome::Malformed)?;
        if params.m_cost() > MAX_M_COST
            || params.t_cost() > MAX_T_COST
            || params.p_cost() > MAX_P_COST
        {
            error!(
                m_cost = params.m_cost(),
                t_cost = params.t_cost(),
                p_cost = params.p_cost(),
                "stored credential asks for more work than the verifier allows"
            );
            return Err(VerifyOutcome::VerifierFailure);
        }

        let Some(salt) = parsed.salt else {
            warn!("stored credential has no salt");
            return Err(VerifyOutcome::Malformed);
        };
        let mut salt_buf = [0u8; 64];
        let salt = salt
            .decode_b64(&mut salt_buf)
            .inspect_err(|e| warn!(error = %e, "stored credential salt is not valid base64"))
            .map_err(|_| VerifyOutcome::Malformed)?
            .to_vec();
        if salt.len() < argon2::MIN_SALT_LEN {
            warn!(salt_len = salt.len(), "stored credential salt is too short");
            return Err(VerifyOutcome::Malformed);
        }

        let Some(expected) = parsed.hash else {
            warn!("stored credential has no digest");
            return Err(VerifyOutcome::Malformed);
        };

        Ok(Self {
            argon2: Argon2::new(algorithm, version, params),
            salt,
            expected: expected.as_bytes().to_vec(),
        })
    }
}
