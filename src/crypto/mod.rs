use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate a random admin API key
pub fn generate_admin_key() -> String {
    let random_bytes: [u8; 24] = rand::random();
    format!(
        "cbk_{}",
        BASE64.encode(random_bytes).replace(['+', '/', '='], "")
    )
}

/// Generate a random secret for signing manage links
pub fn generate_secret() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Hash an admin key for storage in `ADMIN_API_KEY_HASH`
pub fn hash_admin_key(api_key: &str) -> Result<String> {
    bcrypt::hash(api_key, 10).context("Failed to hash admin key")
}

/// Verify an admin key against a hash
pub fn verify_admin_key(api_key: &str, hash: &str) -> bool {
    bcrypt::verify(api_key, hash).unwrap_or(false)
}

/// Token that lets a client manage one appointment without an account.
/// HMAC-SHA256 of the appointment id, hex encoded.
pub fn manage_token(appointment_id: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid HMAC key")?;
    mac.update(appointment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a manage token in constant time
pub fn verify_manage_token(appointment_id: &str, token: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(token) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(appointment_id.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_key_generation() {
        let key = generate_admin_key();
        assert!(key.starts_with("cbk_"));
        assert!(key.len() > 10);
        assert_ne!(key, generate_admin_key());
    }

    #[test]
    fn test_admin_key_hashing() {
        let key = generate_admin_key();
        let hash = hash_admin_key(&key).unwrap();

        assert!(verify_admin_key(&key, &hash));
        assert!(!verify_admin_key("wrong_key", &hash));
        assert!(!verify_admin_key(&key, "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_manage_token() {
        let secret = generate_secret();
        let token = manage_token("apt_1", &secret).unwrap();

        assert_eq!(token.len(), 64);
        assert!(verify_manage_token("apt_1", &token, &secret));
        assert!(!verify_manage_token("apt_2", &token, &secret));
        assert!(!verify_manage_token("apt_1", &token, "other secret"));
        assert!(!verify_manage_token("apt_1", "zz-not-hex", &secret));
    }
}
