//! File, policy and wire types for avatar uploads.

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Default acceptance list for avatar files.
pub const DEFAULT_ACCEPT: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Default size ceiling: 5 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 5 * 1024 * 1024;

/// An in-memory file selected for upload. The payload is reference-counted,
/// so previews and request bodies share it without copying.
#[derive(Debug, Clone)]
pub struct AvatarFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl AvatarFile {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Validation failure for a selected file. Messages are end-user copy and
/// surface verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    #[error("Tipo de archivo inválido")]
    InvalidType,

    #[error("Archivo muy grande. Máx: {max_mb}MB")]
    TooLarge { max_mb: u64 },
}

/// Accepted content types and size ceiling, checked by the caller before an
/// upload is started.
#[derive(Debug, Clone)]
pub struct AvatarPolicy {
    pub accept: Vec<String>,
    pub max_size: u64,
}

impl Default for AvatarPolicy {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT.iter().map(ToString::to_string).collect(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl AvatarPolicy {
    /// Check `file` against the policy. Size is compared strictly, a file of
    /// exactly `max_size` bytes passes.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] describing the first violated rule.
    pub fn check(&self, file: &AvatarFile) -> Result<(), FileError> {
        if !self.accept.iter().any(|accepted| accepted == &file.content_type) {
            return Err(FileError::InvalidType);
        }

        if file.size() > self.max_size {
            return Err(FileError::TooLarge {
                max_mb: rounded_mb(self.max_size),
            });
        }

        Ok(())
    }
}

// Half-up, so a 1.5 MiB ceiling reads as "2MB".
fn rounded_mb(bytes: u64) -> u64 {
    (bytes + 512 * 1024) / (1024 * 1024)
}

/// An upload slot granted by the core: where to push the file and the
/// identifiers the avatar will be served under.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub image_id: String,
    pub delivery_url: String,
}

/// Envelope around a slot grant.
#[derive(Debug, Deserialize)]
pub(crate) struct SlotEnvelope {
    #[serde(default)]
    pub success: bool,
    pub result: Option<UploadSlot>,
    #[serde(default)]
    pub errors: Vec<SlotIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotIssue {
    pub message: String,
}

/// Final identifiers of a delivered avatar. Both values come from the slot;
/// the storage response is authoritative only about transfer success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAvatar {
    pub image_id: String,
    pub delivery_url: String,
}

/// Caller-held stand-in shown while an upload is in flight.
///
/// Release it only once the delivered avatar is actually displayable, so the
/// user never looks at a gap. Dropping an unreleased preview logs a warning,
/// pointing at a caller that forgot the hand-off.
#[derive(Debug)]
pub struct LocalPreview {
    bytes: Bytes,
    content_type: String,
    released: bool,
}

impl LocalPreview {
    #[must_use]
    pub fn new(file: &AvatarFile) -> Self {
        Self {
            bytes: file.bytes.clone(),
            content_type: file.content_type.clone(),
            released: false,
        }
    }

    /// Preview payload; empty once released.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drop the payload after the replacement display resource is ready.
    pub fn release(&mut self) {
        self.bytes = Bytes::new();
        self.released = true;
    }
}

impl Drop for LocalPreview {
    fn drop(&mut self) {
        if !self.released {
            warn!("avatar preview dropped without an explicit release");
        }
    }
}
