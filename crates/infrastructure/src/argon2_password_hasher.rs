//! Argon2id adapter for the principal password hashing port.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use cambo_application::PasswordHasher as PasswordHasherPort;
use cambo_core::{AppError, AppResult};

// OWASP password storage baseline for Argon2id.
const MEMORY_KIB: u32 = 19_456;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

/// Hashes and verifies principal passwords with Argon2id.
///
/// Produces PHC-formatted strings, so parameters can be raised later
/// without invalidating stored hashes.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with the baseline parameters.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, None)
            .unwrap_or_else(|_| Params::default());

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|error| AppError::Internal(format!("password hashing failed: {error}")))?;

        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|error| {
            AppError::Internal(format!("stored password hash is malformed: {error}"))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use cambo_application::PasswordHasher as PasswordHasherPort;
    use cambo_core::{AppError, AppResult};
    use cambo_domain::validate_password;

    use super::Argon2PasswordHasher;

    // Long enough to pass the principal password policy.
    const PASSWORD: &str = "correct horse battery staple";

    #[test]
    fn verifies_a_policy_compliant_password() -> AppResult<()> {
        validate_password(PASSWORD)?;

        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password(PASSWORD)?;
        assert!(hasher.verify_password(PASSWORD, &hash)?);
        Ok(())
    }

    #[test]
    fn rejects_the_wrong_password() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password(PASSWORD)?;
        assert!(!hasher.verify_password("correct horse battery stable", &hash)?);
        Ok(())
    }

    #[test]
    fn salting_keeps_equal_passwords_distinct_at_rest() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash_password(PASSWORD)?;
        let second = hasher.hash_password(PASSWORD)?;

        assert_ne!(first, second);
        assert!(hasher.verify_password(PASSWORD, &second)?);
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_is_a_storage_fault_not_a_mismatch() {
        let hasher = Argon2PasswordHasher::new();
        let result = hasher.verify_password(PASSWORD, "not-a-phc-string");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
