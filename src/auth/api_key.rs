use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;

use crate::errors::{AppError, Result};

const API_KEY_PREFIX: &str = "oxf_";
const API_KEY_RANDOM_BYTES: usize = 32;
// 32 bytes in unpadded url-safe base64.
const API_KEY_ENCODED_LEN: usize = 43;

pub struct ApiKeyService;

impl ApiKeyService {
    pub fn generate_api_key() -> String {
        let mut bytes = [0u8; API_KEY_RANDOM_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        format!(
            "{}{}",
            API_KEY_PREFIX,
            general_purpose::URL_SAFE_NO_PAD.encode(bytes)
        )
    }

    pub fn validate_api_key_format(key: &str) -> Result<()> {
        let Some(encoded) = key.strip_prefix(API_KEY_PREFIX) else {
            return Err(AppError::InvalidApiKey);
        };

        if encoded.len() != API_KEY_ENCODED_LEN {
            return Err(AppError::InvalidApiKey);
        }

        if !encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::InvalidApiKey);
        }

        Ok(())
    }

    pub fn extract_key_from_header(header_value: &str) -> Result<String> {
        let key = header_value
            .strip_prefix("Bearer ")
            .unwrap_or(header_value)
            .trim();
        Self::validate_api_key_format(key)?;
        Ok(key.to_string())
    }
}
