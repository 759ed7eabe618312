//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<b64 salt>$<b64 key>`.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
pub const DEFAULT_ITERATIONS: u32 = 200_000;
pub const MIN_PASSWORD_LEN: usize = 8;

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Hashes a password with a fresh 16-byte random salt.
pub fn hash_password(password: &str) -> String {
    hash_with_iterations(password, DEFAULT_ITERATIONS)
}

fn hash_with_iterations(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt, iterations);
    format!("{SCHEME}${iterations}${}${}", B64.encode(salt), B64.encode(key))
}

/// Checks a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.len() != 32 {
        return false;
    }
    let actual = derive_key(password, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn validate_new_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the tests fast; the format is identical.
    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_with_iterations("s3creto-largo", TEST_ITERATIONS);
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("s3creto-largo", &stored));
        assert!(!verify_password("s3creto-larga", &stored));
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let a = hash_with_iterations("same", TEST_ITERATIONS);
        let b = hash_with_iterations("same", TEST_ITERATIONS);
        assert_ne!(a, b);
    }

    #[test]
    fn test_salt_is_sixteen_random_bytes() {
        let stored = hash_with_iterations("same", TEST_ITERATIONS);
        let salt_b64 = stored.split('$').nth(2).unwrap();
        let salt = B64.decode(salt_b64).unwrap();
        assert_eq!(salt.len(), SALT_LEN);

        // A v4 UUID would always carry the version nibble 0x4 in byte 6.
        let version_nibbles: Vec<u8> = (0..16)
            .map(|_| {
                let stored = hash_with_iterations("same", TEST_ITERATIONS);
                B64.decode(stored.split('$').nth(2).unwrap()).unwrap()[6] >> 4
            })
            .collect();
        assert!(version_nibbles.iter().any(|n| *n != 4));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        for stored in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$notanumber$AAAA$AAAA",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "pbkdf2-sha256$1000$!!!$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(!verify_password("anything", stored), "{stored} verified");
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn test_password_length_rule() {
        assert!(validate_new_password("corta").is_err());
        assert!(validate_new_password("suficiente").is_ok());
    }
}
