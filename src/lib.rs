//! Client-side facade for the Konto identity core.
//!
//! The crate wraps two remote surfaces behind typed, outcome-returning APIs:
//!
//! - the core auth endpoints (email OTP dispatch and verification, session
//!   lookup, sign-out), reconciled into a process-local [`session::SessionStore`];
//! - the avatar direct-upload protocol: a slot request against the core,
//!   a multipart push to external storage, and result assembly from the slot.
//!
//! Every fallible operation resolves to an explicit `Result` carrying a
//! message safe to surface. Remote failures never panic and nothing is
//! retried; callers own scheduling, rendering and any retry policy.

pub mod auth;
pub mod avatars;
pub mod cli;
pub mod config;
pub mod session;
