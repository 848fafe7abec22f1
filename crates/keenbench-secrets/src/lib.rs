// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aead;
/// Master-key generation and loading.
pub mod master_key;
/// Redaction of secret-shaped fields before logging.
pub mod redact;
/// The encrypted credential store.
pub mod store;

pub use master_key::MasterKey;
pub use store::{OAuthCredentials, ProviderCredentials, SecretStore, SecretsFile};
