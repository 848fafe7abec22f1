// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Stable shared contract types for the KeenBench engine.

/// Conversation-log event kinds (`spec.md` §3 "Conversation log").
pub mod events;
/// The file manifest and deterministic scope hashing (`spec.md` §3, §4.5).
pub mod manifest;
/// Provider/model identifiers and per-phase reasoning effort (`spec.md` §3, §4.8).
pub mod model;

use sha2::{Digest, Sha256};

/// Current wire/contract version embedded in JSON-RPC envelopes.
pub const CONTRACT_VERSION: &str = "keenbench/v1";

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::sha256_hex;

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex(b"hello"), sha256_hex(b"hello"));
    }

    #[test]
    fn sha256_hex_differs_for_different_input() {
        assert_ne!(sha256_hex(b"hello"), sha256_hex(b"world"));
    }

    #[test]
    fn sha256_hex_is_64_hex_chars() {
        let h = sha256_hex(b"anything");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
