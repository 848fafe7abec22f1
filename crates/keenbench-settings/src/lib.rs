// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// `settings.json` schema types.
pub mod model;
/// Loading and atomically persisting settings.
pub mod store;

pub use model::{ConsentMode, ProviderSettings, SettingsFile, ALL_PROVIDERS, SCHEMA_VERSION};
pub use store::SettingsStore;
