//! Password sign-in for the lost & found admin console
//!
//! This crate talks to a hosted identity service (email/password accounts
//! plus a secure-token refresh endpoint) and keeps the current session,
//! publishing every change to anyone watching the auth state.

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Errors raised by the auth client
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// True when the service refused the credentials themselves
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }
}

/// Identity service codes that mean "wrong email or password"
const CREDENTIAL_ERRORS: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
    "MISSING_PASSWORD",
];

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Tokens for the signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix seconds
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    pub fn new(id_token: String, refresh_token: String, expires_in: i64, user: User) -> Self {
        Self {
            id_token,
            refresh_token,
            expires_in,
            expires_at: Utc::now().timestamp() + expires_in,
            user,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// True when the id token will be stale `margin_secs` from now
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        Utc::now().timestamp() + margin_secs >= self.expires_at
    }
}

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub identity_url: String,
    pub token_url: String,
    pub persist_session: bool,
    /// Refresh this many seconds before the id token runs out
    pub refresh_margin_secs: i64,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            identity_url: "https://identitytoolkit.googleapis.com".to_string(),
            token_url: "https://securetoken.googleapis.com".to_string(),
            persist_session: true,
            refresh_margin_secs: 60,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_expires_in(raw: &str) -> Result<i64, AuthError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidToken(format!("unreadable expires_in '{}'", raw)))
}

/// Turn a non-success response into an [`AuthError`]
async fn error_from_response(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return AuthError::NetworkError(e),
    };
    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => {
            // Codes may carry a detail suffix, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER : ..."
            let code = envelope
                .error
                .message
                .split(':')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if CREDENTIAL_ERRORS.contains(&code.as_str()) {
                AuthError::AuthenticationError(envelope.error.message)
            } else {
                AuthError::ApiError(envelope.error.message)
            }
        }
        Err(_) => AuthError::ApiError(format!("{}: {}", status, text)),
    }
}

/// Auth client
pub struct Auth {
    api_key: String,
    http_client: Client,
    options: AuthOptions,
    state: watch::Sender<Option<Session>>,
}

impl Auth {
    pub fn new(api_key: &str, http_client: Client, options: AuthOptions) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            api_key: api_key.to_string(),
            http_client,
            options,
            state,
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    fn store_session(&self, session: Option<Session>) {
        if session.is_some() && !self.options.persist_session {
            return;
        }
        self.state.send_replace(session);
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!(
            "{}/v1/accounts:signInWithPassword",
            self.options.identity_url.trim_end_matches('/')
        );

        let payload = PasswordSignInRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!("Sign-in for {} failed: {}", email, err);
            return Err(err);
        }

        let body: PasswordSignInResponse = response.json().await?;
        let session = Session::new(
            body.id_token,
            body.refresh_token,
            parse_expires_in(&body.expires_in)?,
            User {
                uid: body.local_id,
                email: body.email,
                display_name: body.display_name.filter(|n| !n.is_empty()),
            },
        );

        info!("Signed in as {}", session.user.uid);
        self.store_session(Some(session.clone()));
        Ok(session)
    }

    /// The current session, if any
    pub fn get_session(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Adopt a session obtained elsewhere
    pub fn set_session(&self, session: Session) {
        debug!("Adopting session for {}", session.user.uid);
        self.store_session(Some(session));
    }

    /// Exchange the refresh token for a fresh id token
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let current = self.get_session().ok_or(AuthError::MissingSession)?;

        let url = format!("{}/v1/token", self.options.token_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!("Token refresh failed: {}", err);
            return Err(err);
        }

        let body: RefreshResponse = response.json().await?;
        if body.user_id != current.user.uid {
            return Err(AuthError::InvalidToken(format!(
                "refresh returned user {} for session of {}",
                body.user_id, current.user.uid
            )));
        }

        let session = Session::new(
            body.id_token,
            body.refresh_token,
            parse_expires_in(&body.expires_in)?,
            current.user,
        );
        debug!("Refreshed session for {}", session.user.uid);
        self.store_session(Some(session.clone()));
        Ok(session)
    }

    /// The current session, refreshed first when it is about to expire
    pub async fn valid_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        if session.expires_within(self.options.refresh_margin_secs) {
            return self.refresh_session().await;
        }
        Ok(session)
    }

    /// Forget the current session. Tokens are not revoked server-side.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        info!("Signing out {}", session.user.uid);
        self.store_session(None);
        Ok(())
    }

    /// Watch the session. The receiver sees the current value immediately
    /// and is woken on every sign-in, refresh and sign-out.
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }
}
