//! HTTP client for the Konto core auth endpoints.
//!
//! One cookie-holding [`reqwest::Client`] backs every call: the core sets its
//! auth cookies on verification and the jar replays them on later lookups,
//! the way a browser session would. Calls are single-shot, no retries.

use crate::config::{ConfigError, CoreConfig};
use crate::session::Session;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

use super::types::{SendOtpRequest, VerifyEmailRequest};

/// Failure modes of a single call to the core.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The core answered and refused. `message` holds the payload message
    /// when one was present and non-blank.
    #[error("{}", message.as_deref().unwrap_or("request rejected"))]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },

    /// The call never completed: connect, timeout, TLS or body transfer.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The core answered 2xx with a session body this client cannot decode.
    #[error("invalid session payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Client for the core's auth surface.
#[derive(Debug, Clone)]
pub struct CoreClient {
    http: Client,
    config: CoreConfig,
}

impl CoreClient {
    /// Build the client with the configured user agent, timeouts and a
    /// cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: CoreConfig) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // The avatar uploader reuses this client so slot requests ride the same
    // cookie jar as the auth calls.
    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Ask the core to mail an OTP to `request.email`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rejected`] on a non-success status and
    /// [`ProviderError::Transport`] when the call never completes.
    pub async fn send_verification_otp(
        &self,
        request: &SendOtpRequest,
    ) -> Result<(), ProviderError> {
        let url = self.config.endpoint_url("/email-otp/send-verification-otp")?;
        let span = info_span!("core_send_verification_otp", url = %url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .instrument(span)
            .await?;

        ensure_accepted(response).await
    }

    /// Submit an OTP for email verification.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rejected`] when the core refuses the code and
    /// [`ProviderError::Transport`] when the call never completes.
    pub async fn verify_email(&self, request: &VerifyEmailRequest) -> Result<(), ProviderError> {
        let url = self.config.endpoint_url("/email-otp/verify-email")?;
        let span = info_span!("core_verify_email", url = %url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .instrument(span)
            .await?;

        ensure_accepted(response).await
    }

    /// Fetch the canonical session.
    ///
    /// `Ok(None)` means the core answered and there is no session: a 401, a
    /// 204, an empty body or a JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Decode`] when a 2xx body is not a well-formed
    /// session, [`ProviderError::Rejected`] on other non-success statuses and
    /// [`ProviderError::Transport`] when the call never completes.
    pub async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let url = self.config.endpoint_url("/get-session")?;
        let span = info_span!("core_get_session", url = %url);

        let response = self.http.get(&url).send().instrument(span).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let body = response.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        serde_json::from_str(body)
            .map(Some)
            .map_err(ProviderError::Decode)
    }

    /// Invalidate the canonical session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rejected`] on a non-success status and
    /// [`ProviderError::Transport`] when the call never completes.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        let url = self.config.endpoint_url("/sign-out")?;
        let span = info_span!("core_sign_out", url = %url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .instrument(span)
            .await?;

        ensure_accepted(response).await
    }
}

async fn ensure_accepted(response: Response) -> Result<(), ProviderError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(rejection(response).await)
}

async fn rejection(response: Response) -> ProviderError {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    let message = provider_message(&body);
    debug!(%status, "core rejected the request");
    ProviderError::Rejected { status, message }
}

/// Message the core put in an error body, if any.
fn provider_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}
