//! Email OTP authentication against the Konto core.
//!
//! `types` carries the wire payloads and action outcomes, `client` owns the
//! HTTP surface and `actions` layers outcome normalization and session
//! reconciliation on top of it.

pub mod actions;
pub mod client;
pub mod types;
