//! Session code generation
//!
//! Codes are six characters drawn uniformly from `[A-Z0-9]`. Generation is
//! pure; uniqueness among active sessions is enforced when the session row
//! is inserted.

use rand::Rng;

/// Characters a session code may contain
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of every session code
pub const CODE_LENGTH: usize = 6;

/// Generate one candidate session code.
pub fn generate_candidate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trim and uppercase a user-typed code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Whether `code` has the shape of a session code.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
