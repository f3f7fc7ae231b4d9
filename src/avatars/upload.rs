//! Direct-upload coordinator for avatars.
//!
//! Uploads run in three steps: ask the core for a slot, push the file to the
//! storage URL named in the slot, then assemble the result from the slot's
//! identifiers. The storage response never contributes fields to the result.
//!
//! The slot request rides the core's cookie jar; the storage push uses a
//! separate bare client so no core credentials ever reach the storage host.
//! Each step runs once, failures surface immediately.

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

use super::types::{AvatarFile, SlotEnvelope, UploadSlot, UploadedAvatar};
use crate::auth::client::CoreClient;
use crate::config::{ConfigError, CoreConfig};

/// Surfaced when a slot cannot be obtained and the envelope carried no
/// message of its own.
pub const SLOT_REQUEST_FAILED: &str = "Failed to get upload URL";

/// Progress once a slot is granted. The storage push reports no byte-level
/// feedback, so progress jumps from here straight to completion.
pub const SLOT_GRANTED_PROGRESS: u8 = 20;

/// Progress after the storage push succeeded.
pub const COMPLETE_PROGRESS: u8 = 100;

/// Failure modes of an upload or delete.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No usable slot: the endpoint refused, or the envelope carried no
    /// grant. The message is ready for display.
    #[error("{message}")]
    Slot { message: String },

    /// Storage answered the multipart push with a non-success status.
    #[error("Failed to upload avatar to storage")]
    Storage { status: StatusCode },

    /// The core refused to delete a previously uploaded avatar.
    #[error("Failed to delete avatar")]
    Delete { status: StatusCode },

    /// A call never completed: connect, timeout, TLS or body transfer.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Where an upload currently stands. `Succeeded` and `Failed` are terminal
/// until the next invocation replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    RequestingSlot,
    Uploading,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct UploadState {
    phase: RwLock<UploadPhase>,
    progress: AtomicU8,
    error: RwLock<Option<String>>,
}

#[derive(Debug, Serialize)]
struct SlotRequest<'a> {
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

/// Drives avatar uploads and exposes their observable state.
///
/// Clones share state, so one handle can run the upload while another renders
/// progress. The coordinator runs one upload at a time; starting a second
/// while one is in flight is a caller error and simply interleaves the
/// observable state, last writer wins.
#[derive(Debug, Clone)]
pub struct AvatarUploader {
    backend: Client,
    storage: Client,
    config: CoreConfig,
    state: Arc<UploadState>,
}

impl AvatarUploader {
    /// Build an uploader with its own cookie-holding client for the core.
    ///
    /// # Errors
    ///
    /// Returns an error if an underlying HTTP client cannot be built.
    pub fn new(config: CoreConfig) -> Result<Self, UploadError> {
        let backend = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()?;

        Self::with_backend(backend, config)
    }

    /// Build an uploader that shares `core`'s client, so slot requests ride
    /// the same cookie jar as the auth calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage client cannot be built.
    pub fn from_core(core: &CoreClient) -> Result<Self, UploadError> {
        Self::with_backend(core.http().clone(), core.config().clone())
    }

    fn with_backend(backend: Client, config: CoreConfig) -> Result<Self, UploadError> {
        let storage = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            backend,
            storage,
            config,
            state: Arc::new(UploadState {
                phase: RwLock::new(UploadPhase::Idle),
                progress: AtomicU8::new(0),
                error: RwLock::new(None),
            }),
        })
    }

    #[must_use]
    pub fn phase(&self) -> UploadPhase {
        *read(&self.state.phase)
    }

    /// Coarse progress, 0 to 100.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.state.progress.load(Ordering::Relaxed)
    }

    /// Message of the most recent failure, until the next invocation.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        read(&self.state.error).clone()
    }

    #[must_use]
    pub fn is_uploading(&self) -> bool {
        matches!(
            self.phase(),
            UploadPhase::RequestingSlot | UploadPhase::Uploading
        )
    }

    /// Upload `file`, assumed to have passed policy checks already.
    ///
    /// `user_id` is forwarded to the slot endpoint when the upload targets a
    /// specific account rather than the cookie session's own.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] from the first step that fails; the
    /// observable state then lands in [`UploadPhase::Failed`] with the same
    /// message.
    pub async fn upload(
        &self,
        file: &AvatarFile,
        user_id: Option<&str>,
    ) -> Result<UploadedAvatar, UploadError> {
        self.begin();

        match self.run(file, user_id).await {
            Ok(uploaded) => {
                *write(&self.state.phase) = UploadPhase::Succeeded;
                Ok(uploaded)
            }
            Err(err) => {
                *write(&self.state.phase) = UploadPhase::Failed;
                *write(&self.state.error) = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask the core to delete a previously uploaded avatar.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Delete`] on a refusal and
    /// [`UploadError::Transport`] when the call never completes.
    pub async fn delete(&self, image_id: &str) -> Result<(), UploadError> {
        let url = self.config.endpoint_url(&format!("/avatars/{image_id}"))?;
        let span = info_span!("avatars_delete", url = %url);

        let response = self.backend.delete(&url).send().instrument(span).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "avatar delete refused");
            return Err(UploadError::Delete { status });
        }
        Ok(())
    }

    async fn run(
        &self,
        file: &AvatarFile,
        user_id: Option<&str>,
    ) -> Result<UploadedAvatar, UploadError> {
        let slot = self.request_slot(user_id).await?;

        *write(&self.state.phase) = UploadPhase::Uploading;
        self.state
            .progress
            .store(SLOT_GRANTED_PROGRESS, Ordering::Relaxed);

        self.push_to_storage(&slot, file).await?;
        self.state
            .progress
            .store(COMPLETE_PROGRESS, Ordering::Relaxed);

        Ok(UploadedAvatar {
            image_id: slot.image_id,
            delivery_url: slot.delivery_url,
        })
    }

    async fn request_slot(&self, user_id: Option<&str>) -> Result<UploadSlot, UploadError> {
        let url = self.config.endpoint_url("/avatars/upload-url")?;
        let span = info_span!("avatars_request_slot", url = %url);

        let response = self
            .backend
            .post(&url)
            .json(&SlotRequest { user_id })
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "slot request refused");
            return Err(UploadError::Slot {
                message: SLOT_REQUEST_FAILED.to_string(),
            });
        }

        let SlotEnvelope {
            success,
            result,
            errors,
        } = response.json().await?;

        match result {
            Some(slot) if success => Ok(slot),
            _ => {
                let message = errors
                    .into_iter()
                    .next()
                    .map(|issue| issue.message)
                    .unwrap_or_else(|| SLOT_REQUEST_FAILED.to_string());
                Err(UploadError::Slot { message })
            }
        }
    }

    async fn push_to_storage(
        &self,
        slot: &UploadSlot,
        file: &AvatarFile,
    ) -> Result<(), UploadError> {
        let part = Part::stream(Body::from(file.bytes.clone()))
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        let span = info_span!("avatars_push_to_storage", url = %slot.upload_url);

        let response = self
            .storage
            .post(&slot.upload_url)
            .multipart(form)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "storage refused the upload");
            return Err(UploadError::Storage { status });
        }
        Ok(())
    }

    fn begin(&self) {
        *write(&self.state.phase) = UploadPhase::RequestingSlot;
        self.state.progress.store(0, Ordering::Relaxed);
        *write(&self.state.error) = None;
    }
}

// Same recovery as the session store: writers only replace whole values, so a
// poisoned lock still holds a coherent one.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
