//! Signed-in operator context and the gate that produces it.

use std::sync::Arc;

use lostfound_auth::{Session, User};
use lostfound_realtime::RealtimeStore;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::codec::IdCodec;

/// Everything a screen needs on behalf of the signed-in operator.
///
/// Created when the auth service reports a signed-in user and dropped on
/// sign-out. Screens only open with one of these in hand.
#[derive(Clone)]
pub struct SessionContext {
    user: User,
    store: Arc<dyn RealtimeStore>,
    codec: IdCodec,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(user: User, store: Arc<dyn RealtimeStore>, codec: IdCodec) -> Self {
        Self { user, store, codec }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn store(&self) -> &Arc<dyn RealtimeStore> {
        &self.store
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }
}

/// What the gate currently knows about the operator
#[derive(Debug, Clone)]
pub enum GateState {
    /// No notification from the auth service yet
    Pending,
    SignedIn(SessionContext),
    SignedOut,
}

impl GateState {
    pub fn context(&self) -> Option<&SessionContext> {
        match self {
            GateState::SignedIn(context) => Some(context),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, GateState::SignedIn(_))
    }
}

/// Turns auth state notifications into [`SessionContext`]s and keeps the
/// store's credentials in step with them
pub struct SessionGate {
    receiver: watch::Receiver<Option<Session>>,
    store: Arc<dyn RealtimeStore>,
    codec: IdCodec,
    state: GateState,
    started: bool,
}

impl SessionGate {
    pub fn new(
        receiver: watch::Receiver<Option<Session>>,
        store: Arc<dyn RealtimeStore>,
        codec: IdCodec,
    ) -> Self {
        Self {
            receiver,
            store,
            codec,
            state: GateState::Pending,
            started: false,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Wait for the next notification and apply it.
    ///
    /// The first call resolves with the state current at construction.
    /// When the auth service goes away the gate settles on `SignedOut`.
    pub async fn next(&mut self) -> &GateState {
        if self.started {
            if self.receiver.changed().await.is_err() {
                debug!("Auth state channel closed");
                self.apply(None).await;
                return &self.state;
            }
        } else {
            self.started = true;
        }
        let session = self.receiver.borrow_and_update().clone();
        self.apply(session).await;
        &self.state
    }

    async fn apply(&mut self, session: Option<Session>) {
        match session {
            Some(session) => {
                info!(uid = %session.user.uid, "Operator signed in");
                self.store.set_auth(Some(session.id_token.clone())).await;
                self.state = GateState::SignedIn(SessionContext::new(
                    session.user,
                    self.store.clone(),
                    self.codec.clone(),
                ));
            }
            None => {
                if self.state.is_signed_in() {
                    info!("Operator signed out");
                }
                self.store.set_auth(None).await;
                self.state = GateState::SignedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostfound_realtime::MemoryStore;

    fn session() -> Session {
        Session::new(
            "id-token".into(),
            "refresh".into(),
            3600,
            User {
                uid: "uid-1".into(),
                email: Some("admin@example.com".into()),
                display_name: None,
            },
        )
    }

    #[tokio::test]
    async fn follows_sign_in_and_sign_out() {
        let store = MemoryStore::new();
        let (sender, receiver) = watch::channel(None);
        let mut gate = SessionGate::new(receiver, Arc::new(store.clone()), IdCodec::default());
        assert!(matches!(gate.state(), GateState::Pending));

        assert!(matches!(gate.next().await, GateState::SignedOut));

        sender.send_replace(Some(session()));
        let state = gate.next().await;
        assert_eq!(state.context().unwrap().user().uid, "uid-1");
        assert_eq!(store.auth_token().as_deref(), Some("id-token"));

        sender.send_replace(None);
        assert!(matches!(gate.next().await, GateState::SignedOut));
        assert_eq!(store.auth_token(), None);
    }

    #[tokio::test]
    async fn closed_channel_signs_out() {
        let store = MemoryStore::new();
        let (sender, receiver) = watch::channel(Some(session()));
        let mut gate = SessionGate::new(receiver, Arc::new(store), IdCodec::default());
        assert!(gate.next().await.is_signed_in());

        drop(sender);
        assert!(matches!(gate.next().await, GateState::SignedOut));
    }
}
