//! Password hashing with bcrypt. Only hashes are ever stored.

pub const MIN_PASSWORD_CHARS: usize = 6;

pub fn hash_password(plaintext: &str, cost: u32) -> bcrypt::BcryptResult<String> {
    bcrypt::hash(plaintext, cost)
}

/// Constant-time check of `plaintext` against a stored hash. A malformed
/// hash never verifies.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}
