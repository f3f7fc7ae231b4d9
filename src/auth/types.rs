//! Wire payloads and outcomes for the auth actions.
//!
//! Request bodies serialize with the field names the core expects; outcomes
//! carry presentation-ready messages and nothing else. OTP codes ride inside
//! request payloads only and must never be logged.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Purpose attached to an OTP dispatch. The core routes the mail template
/// and the validation scope off this value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OtpPurpose {
    #[default]
    EmailVerification,
    SignIn,
    ForgetPassword,
    /// Forward-compatibility escape hatch: sent verbatim, the core decides
    /// whether it understands the value.
    Other(String),
}

impl OtpPurpose {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::EmailVerification => "email-verification",
            Self::SignIn => "sign-in",
            Self::ForgetPassword => "forget-password",
            Self::Other(purpose) => purpose,
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OtpPurpose {
    fn from(value: &str) -> Self {
        match value {
            "email-verification" => Self::EmailVerification,
            "sign-in" => Self::SignIn,
            "forget-password" => Self::ForgetPassword,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for OtpPurpose {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Body for `POST /email-otp/send-verification-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct SendOtpRequest {
    pub email: String,
    #[serde(rename = "type")]
    pub purpose: OtpPurpose,
}

/// Body for `POST /email-otp/verify-email`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
}

/// Confirmation that the core accepted an OTP dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSent {
    pub message: String,
}

/// Confirmation that an email was verified. `session_synced` reports whether
/// the canonical session also landed in the local store; verification alone
/// does not guarantee it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerified {
    pub message: String,
    pub session_synced: bool,
}

/// Failure outcome of an auth action. The message is already normalized and
/// safe to put in front of a user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
