//! Salted password hashing. Generalizes the teacher's `Keypair` wrapper
//! (`crdt/src/crypto.rs`) from an ed25519 signing key to a one-way salted
//! digest suitable for `userPassword`: the random-material and zeroize-on-
//! drop discipline carries over, the curve does not.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

const SALT_LEN: usize = 16;
const ROUNDS: u32 = 100_000;
const DIGEST_LEN: usize = 32;

/// A salt-plus-digest pair stored verbatim as `userPassword`'s value, in the
/// RFC 2307 `{SCHEME}base64` convention.
const SCHEME: &str = "SSHA256-HMAC";

/// Wraps password material so it is zeroed on drop rather than lingering in
/// memory after use.
#[derive(Zeroize)]
#[zeroize(drop)]
struct SecretBytes(Vec<u8>);

/// Hashes `password` under a freshly generated salt and returns the stored
/// form, e.g. `{SSHA256-HMAC}<base64 of salt || digest>`.
pub fn hash_password(password: &[u8]) -> String {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).expect("system randomness unavailable");
    let digest = derive(password, &salt);
    encode(&salt, &digest)
}

/// Verifies `password` against a value previously produced by
/// [`hash_password`]. Unrecognized schemes or malformed encodings never
/// match.
pub fn verify_password(password: &[u8], stored: &str) -> bool {
    let Some((salt, expected)) = decode(stored) else {
        return false;
    };
    let actual = derive(password, &salt);
    // Constant-time-ish comparison: fold over the full length regardless of
    // an early mismatch so timing doesn't leak the matching prefix length.
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn derive(password: &[u8], salt: &[u8; SALT_LEN]) -> [u8; DIGEST_LEN] {
    let secret = SecretBytes(password.to_vec());
    let mut block = [0u8; DIGEST_LEN];
    block.copy_from_slice(salt);
    for _ in 0..ROUNDS {
        let mut mac = Hmac::<Sha256>::new_from_slice(&secret.0).expect("HMAC accepts any key length");
        mac.update(&block);
        let out = mac.finalize().into_bytes();
        block.copy_from_slice(&out);
    }
    block
}

fn encode(salt: &[u8; SALT_LEN], digest: &[u8; DIGEST_LEN]) -> String {
    let mut buf = Vec::with_capacity(SALT_LEN + DIGEST_LEN);
    buf.extend_from_slice(salt);
    buf.extend_from_slice(digest);
    format!("{{{}}}{}", SCHEME, base64::encode(&buf))
}

fn decode(stored: &str) -> Option<([u8; SALT_LEN], Vec<u8>)> {
    let rest = stored.strip_prefix(&format!("{{{}}}", SCHEME))?;
    let raw = base64::decode(rest).ok()?;
    if raw.len() <= SALT_LEN {
        return None;
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&raw[..SALT_LEN]);
    Some((salt, raw[SALT_LEN..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hash_and_verify() {
        let stored = hash_password(b"correct horse battery staple");
        assert!(verify_password(b"correct horse battery staple", &stored));
        assert!(!verify_password(b"wrong password", &stored));
    }

    #[test]
    fn two_hashes_of_the_same_password_differ_by_salt() {
        let a = hash_password(b"hunter2");
        let b = hash_password(b"hunter2");
        assert_ne!(a, b);
        assert!(verify_password(b"hunter2", &a));
        assert!(verify_password(b"hunter2", &b));
    }

    #[test]
    fn malformed_stored_value_never_matches() {
        assert!(!verify_password(b"anything", "not-a-valid-hash"));
    }
}
