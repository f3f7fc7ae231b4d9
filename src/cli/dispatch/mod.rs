use crate::auth::types::OtpPurpose;
use crate::cli::actions::Action;
use anyhow::Result;
use std::path::PathBuf;

/// Translate parsed matches into an [`Action`].
///
/// # Errors
///
/// Returns an error if a required argument is missing from the matches.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("otp", otp)) => match otp.subcommand() {
            Some(("send", send)) => Ok(Action::SendOtp {
                email: required(send, "email")?,
                purpose: send
                    .get_one::<String>("type")
                    .map(|value| OtpPurpose::from(value.as_str()))
                    .unwrap_or_default(),
            }),
            Some(("verify", verify)) => Ok(Action::VerifyEmail {
                email: required(verify, "email")?,
                code: required(verify, "code")?,
            }),
            _ => Err(anyhow::anyhow!("missing otp subcommand")),
        },

        Some(("session", _)) => Ok(Action::ShowSession),

        Some(("avatar", avatar)) => match avatar.subcommand() {
            Some(("upload", upload)) => Ok(Action::UploadAvatar {
                file: upload
                    .get_one::<PathBuf>("file")
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("missing required argument: <file>"))?,
                user_id: upload.get_one::<String>("user-id").map(|s| s.to_string()),
            }),
            Some(("delete", delete)) => Ok(Action::DeleteAvatar {
                image_id: required(delete, "image-id")?,
            }),
            _ => Err(anyhow::anyhow!("missing avatar subcommand")),
        },

        _ => Err(anyhow::anyhow!("missing subcommand")),
    }
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: <{name}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn action_for(args: &[&str]) -> Result<Action> {
        let matches = commands::new().get_matches_from(args);
        handler(&matches)
    }

    #[test]
    fn test_otp_send() -> Result<()> {
        let action = action_for(&[
            "konto",
            "--core-url",
            "http://localhost:3000",
            "otp",
            "send",
            "nina@example.com",
        ])?;

        match action {
            Action::SendOtp { email, purpose } => {
                assert_eq!(email, "nina@example.com");
                assert_eq!(purpose, OtpPurpose::EmailVerification);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_otp_send_custom_type() -> Result<()> {
        let action = action_for(&[
            "konto",
            "--core-url",
            "http://localhost:3000",
            "otp",
            "send",
            "nina@example.com",
            "--type",
            "two-factor",
        ])?;

        match action {
            Action::SendOtp { purpose, .. } => {
                assert_eq!(purpose, OtpPurpose::Other("two-factor".to_string()));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_otp_verify() -> Result<()> {
        let action = action_for(&[
            "konto",
            "--core-url",
            "http://localhost:3000",
            "otp",
            "verify",
            "nina@example.com",
            "123456",
        ])?;

        match action {
            Action::VerifyEmail { email, code } => {
                assert_eq!(email, "nina@example.com");
                assert_eq!(code, "123456");
            }
            other => panic!("unexpected action: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_session() -> Result<()> {
        let action = action_for(&["konto", "--core-url", "http://localhost:3000", "session"])?;
        assert!(matches!(action, Action::ShowSession));
        Ok(())
    }

    #[test]
    fn test_avatar_upload() -> Result<()> {
        let action = action_for(&[
            "konto",
            "--core-url",
            "http://localhost:3000",
            "avatar",
            "upload",
            "/tmp/avatar.png",
        ])?;

        match action {
            Action::UploadAvatar { file, user_id } => {
                assert_eq!(file, PathBuf::from("/tmp/avatar.png"));
                assert!(user_id.is_none());
            }
            other => panic!("unexpected action: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_avatar_delete() -> Result<()> {
        let action = action_for(&[
            "konto",
            "--core-url",
            "http://localhost:3000",
            "avatar",
            "delete",
            "img-1",
        ])?;

        match action {
            Action::DeleteAvatar { image_id } => assert_eq!(image_id, "img-1"),
            other => panic!("unexpected action: {other:?}"),
        }
        Ok(())
    }
}
