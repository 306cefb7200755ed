//! PBKDF2 password hashing
//!
//! Hashes are stored as `salt_hex:key_hex`.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 32;
const KEY_LEN: usize = 32;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt);
    format!("{}:{}", hex::encode(salt), hex::encode(key))
}

/// Check a password against a stored hash
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Some((salt_hex, key_hex)) = password_hash.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(stored_key)) = (hex::decode(salt_hex), hex::decode(key_hex)) else {
        return false;
    };
    if salt.is_empty() || stored_key.len() != KEY_LEN {
        return false;
    }

    let key = derive_key(password, &salt);
    key.as_slice().ct_eq(stored_key.as_slice()).into()
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}
