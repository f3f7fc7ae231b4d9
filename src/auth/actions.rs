//! Auth actions: OTP dispatch, email verification and session reconciliation.
//!
//! Actions translate client failures into [`ActionError`] values with a
//! message that can go straight to a user: a provider message passes through
//! when the core sent one, otherwise a fixed per-action fallback is used.
//! Each action performs at most one attempt per remote call; retrying is the
//! caller's decision.

use regex::Regex;
use tracing::{debug, warn};

use super::client::{CoreClient, ProviderError};
use super::types::{ActionError, EmailVerified, OtpPurpose, OtpSent, SendOtpRequest, VerifyEmailRequest};
use crate::session::{Session, SessionStore};

const OTP_SENT: &str = "OTP sent successfully";
const SEND_OTP_FALLBACK: &str = "Failed to send OTP";
const EMAIL_VERIFIED: &str = "Email verified successfully";
const VERIFY_EMAIL_FALLBACK: &str = "Email verification failed";
const SESSION_FALLBACK: &str = "Failed to fetch session";
const SIGN_OUT_FALLBACK: &str = "Failed to sign out";
const INVALID_EMAIL: &str = "Invalid email address";

/// Ask the core to mail a verification code to `email`.
///
/// The email is validated before any network traffic happens.
///
/// # Errors
///
/// Returns an [`ActionError`] with the provider's message when the core
/// refused with one, otherwise with a fixed fallback.
pub async fn send_verification_otp(
    core: &CoreClient,
    email: &str,
    purpose: OtpPurpose,
) -> Result<OtpSent, ActionError> {
    let email = email.trim();
    if !valid_email(email) {
        return Err(ActionError::new(INVALID_EMAIL));
    }

    let request = SendOtpRequest {
        email: email.to_string(),
        purpose,
    };

    core.send_verification_otp(&request)
        .await
        .map(|()| OtpSent {
            message: OTP_SENT.to_string(),
        })
        .map_err(|err| normalize(err, SEND_OTP_FALLBACK))
}

/// Submit an OTP for `email` and, on success, reconcile the local store with
/// the canonical session.
///
/// Reconciliation is best-effort: once the core accepts the code the action
/// succeeds even when the follow-up session fetch fails or comes back empty.
/// `session_synced` reports what actually happened, and the store is only
/// written when a well-formed session arrived.
///
/// # Errors
///
/// Returns an [`ActionError`] only when the verification call itself fails.
pub async fn verify_email_with_otp(
    core: &CoreClient,
    store: &SessionStore,
    email: &str,
    otp: &str,
) -> Result<EmailVerified, ActionError> {
    let request = VerifyEmailRequest {
        email: email.trim().to_string(),
        otp: otp.trim().to_string(),
    };

    if let Err(err) = core.verify_email(&request).await {
        return Err(normalize(err, VERIFY_EMAIL_FALLBACK));
    }

    let session_synced = match core.get_session().await {
        Ok(Some(session)) => {
            store.set(session);
            true
        }
        Ok(None) => {
            debug!("email verified but the core reported no session");
            false
        }
        Err(err) => {
            warn!(error = %err, "email verified but the session fetch failed");
            false
        }
    };

    Ok(EmailVerified {
        message: EMAIL_VERIFIED.to_string(),
        session_synced,
    })
}

/// Fetch the canonical session and mirror it into the store.
///
/// A confirmed "no session" answer clears the store; a failed fetch leaves
/// it untouched, since nothing was learned about the canonical state.
///
/// # Errors
///
/// Returns an [`ActionError`] when the session lookup fails.
pub async fn refresh_session(
    core: &CoreClient,
    store: &SessionStore,
) -> Result<Option<Session>, ActionError> {
    match core.get_session().await {
        Ok(Some(session)) => {
            store.set(session.clone());
            Ok(Some(session))
        }
        Ok(None) => {
            store.clear();
            Ok(None)
        }
        Err(err) => Err(normalize(err, SESSION_FALLBACK)),
    }
}

/// Invalidate the canonical session and clear the local store.
///
/// # Errors
///
/// Returns an [`ActionError`] when the core call fails; the store keeps its
/// value then, because the canonical session may still be live.
pub async fn sign_out(core: &CoreClient, store: &SessionStore) -> Result<(), ActionError> {
    core.sign_out()
        .await
        .map_err(|err| normalize(err, SIGN_OUT_FALLBACK))?;

    store.clear();
    Ok(())
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

fn normalize(err: ProviderError, fallback: &str) -> ActionError {
    let message = match err {
        ProviderError::Rejected {
            message: Some(message),
            ..
        } if !message.trim().is_empty() => message,
        ProviderError::Rejected { .. } => fallback.to_string(),
        other => {
            let rendered = other.to_string();
            if rendered.trim().is_empty() {
                fallback.to_string()
            } else {
                rendered
            }
        }
    };

    ActionError { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use crate::config::CoreConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client_for(server: &MockServer) -> Result<CoreClient> {
        Ok(CoreClient::new(CoreConfig::new(server.uri()))?)
    }

    fn session_body(user_id: &str) -> serde_json::Value {
        serde_json::json!({
            "user": {
                "id": user_id,
                "name": "Nina",
                "email": "nina@example.com",
                "emailVerified": true,
                "createdAt": "2025-04-01T10:00:00.000Z",
                "updatedAt": "2025-04-01T10:00:00.000Z"
            },
            "session": {
                "id": "lease-1",
                "userId": user_id,
                "token": "tok-1",
                "expiresAt": "2025-05-01T10:00:00.000Z",
                "createdAt": "2025-04-01T10:00:00.000Z",
                "updatedAt": "2025-04-01T10:00:00.000Z"
            }
        })
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("nina@example.com"));
        assert!(valid_email("n.i+na@sub.example.com"));
        assert!(!valid_email(""));
        assert!(!valid_email("nina"));
        assert!(!valid_email("nina@example"));
        assert!(!valid_email("nina @example.com"));
    }

    #[tokio::test]
    async fn test_send_otp_success() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_send_otp_success: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/send-verification-otp"))
            .and(body_json(serde_json::json!({
                "email": "nina@example.com",
                "type": "sign-in"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let sent = send_verification_otp(&core, " nina@example.com ", OtpPurpose::SignIn)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert_eq!(sent.message, "OTP sent successfully");
        Ok(())
    }

    #[tokio::test]
    async fn test_send_otp_twice_issues_two_calls() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_send_otp_twice_issues_two_calls: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/send-verification-otp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .expect(2)
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        for _ in 0..2 {
            let sent = send_verification_otp(&core, "nina@example.com", OtpPurpose::default())
                .await
                .map_err(|err| anyhow::anyhow!(err))?;
            assert_eq!(sent.message, "OTP sent successfully");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_send_otp_invalid_email_skips_network() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_send_otp_invalid_email_skips_network: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/send-verification-otp"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let error = send_verification_otp(&core, "not-an-email", OtpPurpose::default())
            .await
            .unwrap_err();

        assert_eq!(error.message, "Invalid email address");
        Ok(())
    }

    #[tokio::test]
    async fn test_send_otp_passes_provider_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_send_otp_passes_provider_message: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/send-verification-otp"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "message": "Too many requests"
            })))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let error = send_verification_otp(&core, "nina@example.com", OtpPurpose::default())
            .await
            .unwrap_err();

        assert_eq!(error.message, "Too many requests");
        Ok(())
    }

    #[tokio::test]
    async fn test_send_otp_fallback_without_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_send_otp_fallback_without_message: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/send-verification-otp"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let error = send_verification_otp(&core, "nina@example.com", OtpPurpose::default())
            .await
            .unwrap_err();

        assert_eq!(error.message, "Failed to send OTP");
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_email_syncs_session() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_verify_email_syncs_session: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/verify-email"))
            .and(body_json(serde_json::json!({
                "email": "nina@example.com",
                "otp": "123456"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-1")))
            .expect(1)
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();

        let verified = verify_email_with_otp(&core, &store, "nina@example.com", " 123456 ")
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert_eq!(verified.message, "Email verified successfully");
        assert!(verified.session_synced);
        assert_eq!(
            store.get().map(|session| session.user.id),
            Some("user-1".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_email_succeeds_when_session_fetch_fails() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_verify_email_succeeds_when_session_fetch_fails: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/verify-email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();

        let verified = verify_email_with_otp(&core, &store, "nina@example.com", "123456")
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert_eq!(verified.message, "Email verified successfully");
        assert!(!verified.session_synced);
        assert!(store.get().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_email_keeps_store_when_no_session_returned() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_verify_email_keeps_store_when_no_session_returned: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/verify-email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();
        store.set(serde_json::from_value(session_body("previous-user"))?);

        let verified = verify_email_with_otp(&core, &store, "nina@example.com", "123456")
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert!(!verified.session_synced);
        assert_eq!(
            store.get().map(|session| session.user.id),
            Some("previous-user".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_email_passes_provider_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_verify_email_passes_provider_message: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/verify-email"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "Invalid OTP"
            })))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();

        let error = verify_email_with_otp(&core, &store, "nina@example.com", "000000")
            .await
            .unwrap_err();

        assert_eq!(error.message, "Invalid OTP");
        assert!(store.get().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_email_fallback_without_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_verify_email_fallback_without_message: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/email-otp/verify-email"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{}"))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();

        let error = verify_email_with_otp(&core, &store, "nina@example.com", "000000")
            .await
            .unwrap_err();

        assert_eq!(error.message, "Email verification failed");
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_session_mirrors_the_core() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_refresh_session_mirrors_the_core: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-2")))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();

        let session = refresh_session(&core, &store)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert_eq!(
            session.map(|session| session.user.id),
            Some("user-2".to_string())
        );
        assert!(store.is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_session_clears_on_confirmed_absence() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_refresh_session_clears_on_confirmed_absence: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();
        store.set(serde_json::from_value(session_body("stale-user"))?);

        let session = refresh_session(&core, &store)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert!(session.is_none());
        assert!(!store.is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_session_failure_keeps_store() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!(
                "skipping test_refresh_session_failure_keeps_store: cannot bind to localhost"
            );
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/get-session"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();
        store.set(serde_json::from_value(session_body("kept-user"))?);

        let error = refresh_session(&core, &store).await.unwrap_err();

        assert_eq!(error.message, "Failed to fetch session");
        assert_eq!(
            store.get().map(|session| session.user.id),
            Some("kept-user".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_clears_store() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_sign_out_clears_store: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign-out"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();
        store.set(serde_json::from_value(session_body("user-3"))?);

        sign_out(&core, &store)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        assert!(!store.is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_store() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("skipping test_sign_out_failure_keeps_store: cannot bind to localhost");
            return Ok(());
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign-out"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let core = client_for(&server)?;
        let store = SessionStore::new();
        store.set(serde_json::from_value(session_body("user-4"))?);

        let error = sign_out(&core, &store).await.unwrap_err();

        assert_eq!(error.message, "Failed to sign out");
        assert!(store.is_authenticated());
        Ok(())
    }
}
