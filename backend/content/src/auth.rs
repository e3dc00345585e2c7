//! # Admin Passwords
//!
//! PBKDF2-SHA256, encoded as `pbkdf2_sha256$<iterations>$<salt>$<base64 hash>`.
//!
//! The iteration count travels with the hash, so raising the default only
//! affects newly created admins.
use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::Sha256;

pub const ALGORITHM: &str = "pbkdf2_sha256";
pub const DEFAULT_ITERATIONS: u32 = 600_000;
pub const MIN_PASSWORD_LEN: usize = 8;

const SALT_LEN: usize = 22;
const HASH_LEN: usize = 32;

pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();

    encode(password, &salt, iterations)
}

pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(4, '$');

    let (Some(ALGORITHM), Some(iterations), Some(salt), Some(_)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };

    if iterations == 0 {
        return false;
    }

    constant_time_eq(encode(password, salt, iterations).as_bytes(), encoded.as_bytes())
}

fn encode(password: &str, salt: &str, iterations: u32) -> String {
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut hash);

    format!("{ALGORITHM}${iterations}${salt}${}", STANDARD.encode(hash))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
