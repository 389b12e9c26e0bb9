//! Configuration options for the lost & found console

use std::env;
use std::time::Duration;

use url::Url;

use crate::codec::DEFAULT_SECRET;
use crate::error::{ConsoleError, Result};

/// Tunables that have sensible defaults
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Secret for the URL token codec
    pub url_secret: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Keep the session after sign-in
    pub persist_session: bool,

    /// Identity service base URL
    pub identity_url: String,

    /// Token refresh service base URL
    pub token_url: String,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        let auth = lostfound_auth::AuthOptions::default();
        Self {
            url_secret: DEFAULT_SECRET.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            persist_session: auth.persist_session,
            identity_url: auth.identity_url,
            token_url: auth.token_url,
        }
    }
}

impl ConsoleOptions {
    /// Set the URL token secret
    pub fn with_url_secret(mut self, value: &str) -> Self {
        self.url_secret = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the identity service base URL
    pub fn with_identity_url(mut self, value: &str) -> Self {
        self.identity_url = value.to_string();
        self
    }

    /// Set the token refresh base URL
    pub fn with_token_url(mut self, value: &str) -> Self {
        self.token_url = value.to_string();
        self
    }

    pub(crate) fn auth_options(&self) -> lostfound_auth::AuthOptions {
        lostfound_auth::AuthOptions {
            identity_url: self.identity_url.clone(),
            token_url: self.token_url.clone(),
            persist_session: self.persist_session,
            ..lostfound_auth::AuthOptions::default()
        }
    }
}

/// Where the console connects to
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub database_url: Url,
    pub api_key: String,
    pub options: ConsoleOptions,
}

impl ConsoleConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(database_url: &str, api_key: &str, options: ConsoleOptions) -> Result<Self> {
        let database_url = Url::parse(database_url)?;
        if !matches!(database_url.scheme(), "http" | "https") {
            return Err(ConsoleError::config(format!(
                "database URL must be http(s), got {}",
                database_url.scheme()
            )));
        }
        if api_key.trim().is_empty() {
            return Err(ConsoleError::config("api key cannot be empty"));
        }
        Url::parse(&options.identity_url)?;
        Url::parse(&options.token_url)?;
        Ok(Self {
            database_url,
            api_key: api_key.to_string(),
            options,
        })
    }

    /// Read `LOSTFOUND_*` variables, loading a `.env` file first when present.
    ///
    /// `LOSTFOUND_DATABASE_URL` and `LOSTFOUND_API_KEY` are required;
    /// `LOSTFOUND_URL_SECRET`, `LOSTFOUND_IDENTITY_URL`, `LOSTFOUND_TOKEN_URL`
    /// and `LOSTFOUND_REQUEST_TIMEOUT_SECS` override the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ConsoleConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConsoleError::config(format!("{} is not set", name)))
        };
        let database_url = required("LOSTFOUND_DATABASE_URL")?;
        let api_key = required("LOSTFOUND_API_KEY")?;

        let mut options = ConsoleOptions::default();
        if let Some(secret) = lookup("LOSTFOUND_URL_SECRET") {
            options = options.with_url_secret(&secret);
        }
        if let Some(url) = lookup("LOSTFOUND_IDENTITY_URL") {
            options = options.with_identity_url(&url);
        }
        if let Some(url) = lookup("LOSTFOUND_TOKEN_URL") {
            options = options.with_token_url(&url);
        }
        if let Some(secs) = lookup("LOSTFOUND_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ConsoleError::config(format!(
                    "LOSTFOUND_REQUEST_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    secs
                ))
            })?;
            let timeout = (secs > 0).then(|| Duration::from_secs(secs));
            options = options.with_request_timeout(timeout);
        }

        Self::new(&database_url, &api_key, options)
    }
}
