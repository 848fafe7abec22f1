#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Provider-call gating.
pub mod gate;
/// The consent record shape and its persisted form.
pub mod record;

pub use gate::ConsentGate;
pub use record::{ConsentRecord, EgressConsentFile};
