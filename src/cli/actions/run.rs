use super::Action;
use crate::auth::actions::{refresh_session, send_verification_otp, verify_email_with_otp};
use crate::auth::client::CoreClient;
use crate::avatars::types::{AvatarFile, AvatarPolicy, LocalPreview};
use crate::avatars::upload::AvatarUploader;
use crate::config::CoreConfig;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Execute the provided action.
///
/// # Errors
///
/// Returns an error if the action fails.
pub async fn execute(action: Action, config: &CoreConfig) -> Result<()> {
    let core = CoreClient::new(config.clone())?;
    let store = SessionStore::new();

    match action {
        Action::SendOtp { email, purpose } => {
            let sent = send_verification_otp(&core, &email, purpose).await?;
            println!("{}", sent.message);
        }

        Action::VerifyEmail { email, code } => {
            let verified = verify_email_with_otp(&core, &store, &email, &code).await?;
            println!("{}", verified.message);

            match store.get() {
                Some(session) => println!(
                    "signed in as {} until {}",
                    session.user.email, session.session.expires_at
                ),
                None => println!("no session was established, sign in separately"),
            }
        }

        Action::ShowSession => match refresh_session(&core, &store).await? {
            Some(session) => {
                println!("user:    {} <{}>", session.user.name, session.user.email);
                println!("id:      {}", session.user.id);
                println!("expires: {}", session.session.expires_at);
            }
            None => println!("no active session"),
        },

        Action::UploadAvatar { file, user_id } => {
            let avatar = read_avatar(&file).await?;
            AvatarPolicy::default().check(&avatar)?;

            let mut preview = LocalPreview::new(&avatar);
            let uploader = AvatarUploader::from_core(&core)?;
            let uploaded = uploader.upload(&avatar, user_id.as_deref()).await?;
            preview.release();

            println!("image id:     {}", uploaded.image_id);
            println!("delivery url: {}", uploaded.delivery_url);
        }

        Action::DeleteAvatar { image_id } => {
            let uploader = AvatarUploader::from_core(&core)?;
            uploader.delete(&image_id).await?;
            println!("deleted {image_id}");
        }
    }

    Ok(())
}

async fn read_avatar(path: &Path) -> Result<AvatarFile> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("avatar")
        .to_string();

    Ok(AvatarFile::new(file_name, content_type_for(path), bytes))
}

fn content_type_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    };

    content_type.to_string()
}
