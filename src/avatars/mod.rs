//! Avatar selection, validation and direct upload.
//!
//! `types` holds the file model, the acceptance policy and the slot wire
//! shapes; `upload` drives the three-step protocol against the core and the
//! storage service.

pub mod types;
pub mod upload;
