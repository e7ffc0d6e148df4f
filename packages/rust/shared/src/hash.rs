//! Content fingerprinting for event deduplication.
//!
//! The fingerprint is a SHA-256 digest of the whitespace-stripped row text,
//! rendered as 64 lowercase hex characters. Stripping whitespace first means
//! a re-published row that only gained or lost incidental spacing still
//! collapses onto the already-stored record.

use sha2::{Digest, Sha256};

use crate::normalize;

/// Expected fingerprint length: SHA-256 as lowercase hex.
pub const HASH_LEN: usize = 64;

/// Compute the content fingerprint of `text`.
pub fn create(text: &str) -> String {
    let normalized = normalize::strip(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check whether `candidate` is a well-formed fingerprint: exactly
/// [`HASH_LEN`] characters, all lowercase hex digits.
pub fn is_valid(candidate: &str) -> bool {
    candidate.len() == HASH_LEN
        && candidate
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
