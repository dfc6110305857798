use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::{AppError, Result};

// bcrypt ignores everything past 72 bytes.
const MAX_PASSWORD_BYTES: usize = 72;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to verify password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<()> {
        if password.chars().count() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::Validation(
                "Password must be at most 72 bytes long".to_string(),
            ));
        }

        Ok(())
    }
}
