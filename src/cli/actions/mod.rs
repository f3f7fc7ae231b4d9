// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

use crate::auth::types::OtpPurpose;
use crate::config::CoreConfig;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    SendOtp {
        email: String,
        purpose: OtpPurpose,
    },
    VerifyEmail {
        email: String,
        code: String,
    },
    ShowSession,
    UploadAvatar {
        file: PathBuf,
        user_id: Option<String>,
    },
    DeleteAvatar {
        image_id: String,
    },
}

impl Action {
    // Convenience wrapper so call sites can do `action.execute(&config).await`.
    // When adding new actions, extend the match in `run::execute`.
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, config: &CoreConfig) -> anyhow::Result<()> {
        run::execute(self, config).await
    }
}
