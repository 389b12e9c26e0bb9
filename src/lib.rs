//! Lost & Found admin console
//!
//! Staff sign in, then manage item records (lost, found, claimed) and browse
//! registered users. Data lives in a hosted realtime document store; every
//! screen follows it through a push subscription.

pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod status;
pub mod views;

use std::sync::Arc;

use lostfound_auth::{Auth, AuthError};
use lostfound_realtime::{RealtimeStore, RestStore};
use reqwest::Client;
use tracing::{debug, info};

use crate::codec::IdCodec;
use crate::config::{ConsoleConfig, ConsoleOptions};
use crate::error::{ConsoleError, Result};
use crate::session::{SessionContext, SessionGate};

/// The main entry point: wires auth, the store and the URL codec together
pub struct LostFoundAdmin {
    auth: Auth,
    store: Arc<dyn RealtimeStore>,
    codec: IdCodec,
}

impl LostFoundAdmin {
    /// Connect to the hosted services named in `config`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lostfound_admin::{config::{ConsoleConfig, ConsoleOptions}, LostFoundAdmin};
    ///
    /// let config = ConsoleConfig::new(
    ///     "https://lostfound-default-rtdb.firebaseio.com",
    ///     "your-api-key",
    ///     ConsoleOptions::default(),
    /// )?;
    /// let admin = LostFoundAdmin::new(config)?;
    /// # Ok::<(), lostfound_admin::error::ConsoleError>(())
    /// ```
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let mut builder = Client::builder();
        // Push subscriptions stay open until their view closes, so streams
        // only get a connect timeout.
        let mut stream_builder = Client::builder();
        if let Some(timeout) = config.options.request_timeout {
            builder = builder.timeout(timeout);
            stream_builder = stream_builder.connect_timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ConsoleError::config(format!("cannot build HTTP client: {}", e)))?;
        let stream_client = stream_builder
            .build()
            .map_err(|e| ConsoleError::config(format!("cannot build HTTP client: {}", e)))?;

        let store = RestStore::new(config.database_url.as_str(), http_client.clone())
            .map_err(ConsoleError::config)?
            .with_stream_client(stream_client);
        let auth = Auth::new(&config.api_key, http_client, config.options.auth_options());
        info!(database = %config.database_url, "Console configured");

        Ok(Self::with_parts(auth, Arc::new(store), &config.options))
    }

    /// Configuration from `LOSTFOUND_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ConsoleConfig::from_env()?)
    }

    /// Assemble from existing collaborators, e.g. an in-process store
    pub fn with_parts(auth: Auth, store: Arc<dyn RealtimeStore>, options: &ConsoleOptions) -> Self {
        Self {
            auth,
            store,
            codec: IdCodec::new(&options.url_secret),
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn store(&self) -> &Arc<dyn RealtimeStore> {
        &self.store
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    /// A gate following this console's auth state
    pub fn session_gate(&self) -> SessionGate {
        SessionGate::new(
            self.auth.on_auth_state_change(),
            self.store.clone(),
            self.codec.clone(),
        )
    }

    /// Sign in and hand back the context screens are opened with
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionContext> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.store.set_auth(Some(session.id_token.clone())).await;
        Ok(self.context_for(session.user))
    }

    /// Context for the current session, refreshing its token when needed
    pub async fn current_context(&self) -> Result<SessionContext> {
        let session = match self.auth.valid_session().await {
            Ok(session) => session,
            Err(AuthError::MissingSession) => return Err(ConsoleError::NotSignedIn),
            Err(e) => return Err(e.into()),
        };
        debug!(uid = %session.user.uid, "Using current session");
        self.store.set_auth(Some(session.id_token.clone())).await;
        Ok(self.context_for(session.user))
    }

    fn context_for(&self, user: lostfound_auth::User) -> SessionContext {
        SessionContext::new(user, self.store.clone(), self.codec.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::codec::IdCodec;
    pub use crate::config::{ConsoleConfig, ConsoleOptions};
    pub use crate::error::ConsoleError;
    pub use crate::models::{FormField, ItemForm, ItemRecord, UserRecord};
    pub use crate::routes::{resolve, Navigation, Route};
    pub use crate::session::{GateState, SessionContext, SessionGate};
    pub use crate::status::{available_action, ItemStatus, StatusAction};
    pub use crate::views::{
        ItemDetailView, ItemFormView, ItemsListView, LiveView, StatsView, UsersListView,
    };
    pub use crate::LostFoundAdmin;
}
