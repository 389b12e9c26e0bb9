use chrono::Utc;
use lostfound_realtime::{Subscription, SubscriptionEvent};
use tracing::{debug, error, warn};

use super::{item_path, locate_item, subscribe, LiveView, ViewState};
use crate::error::{ConsoleError, Result};
use crate::models::ItemRecord;
use crate::routes::Route;
use crate::session::SessionContext;
use crate::status::{available_action, status_label, transition_fields, StatusAction};

pub const NOT_FOUND_MESSAGE: &str = "Item not found";

/// What the detail screen is showing
#[derive(Debug, PartialEq)]
pub enum DetailStatus<'a> {
    Loading,
    NotFound,
    Failed(&'a str),
    Ready(&'a ItemRecord),
}

/// One item, with its status shortcut
pub struct ItemDetailView {
    context: SessionContext,
    token: String,
    key: Option<String>,
    subscription: Option<Subscription>,
    item: Option<ItemRecord>,
    not_found: bool,
    state: ViewState,
}

impl ItemDetailView {
    /// Open the screen for an address token.
    ///
    /// A token that does not decode, or a record that does not exist, leaves
    /// the screen showing "Item not found" rather than failing.
    pub async fn open(context: &SessionContext, token: &str) -> Self {
        let mut view = Self {
            context: context.clone(),
            token: token.to_string(),
            key: None,
            subscription: None,
            item: None,
            not_found: false,
            state: ViewState::loading(),
        };

        let (key, path) = match locate_item(context, token) {
            Ok(located) => located,
            Err(e) => {
                warn!(%token, "Unreadable item token: {}", e);
                view.mark_not_found();
                return view;
            }
        };
        view.key = Some(key);

        match subscribe(context, &path).await {
            Ok(subscription) => view.subscription = Some(subscription),
            Err(e) => {
                error!(%path, "{}", e);
                view.state.loading = false;
                view.state.error = Some(format!("Error loading item: {}", e));
            }
        }
        view
    }

    fn mark_not_found(&mut self) {
        self.state.loading = false;
        self.not_found = true;
        self.item = None;
        self.state.error = Some(NOT_FOUND_MESSAGE.to_string());
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Decoded record key, when the token was valid
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn item(&self) -> Option<&ItemRecord> {
        self.item.as_ref()
    }

    pub fn status(&self) -> DetailStatus<'_> {
        if self.not_found {
            return DetailStatus::NotFound;
        }
        match (&self.item, &self.state.error) {
            (Some(item), _) => DetailStatus::Ready(item),
            (None, Some(error)) => DetailStatus::Failed(error),
            (None, None) => DetailStatus::Loading,
        }
    }

    /// The status shortcut to show, hidden while a write is in flight
    pub fn offered_action(&self) -> Option<StatusAction> {
        if self.state.busy {
            return None;
        }
        available_action(self.item.as_ref()?.status())
    }

    pub fn back_route(&self) -> Route {
        Route::Items
    }

    pub fn edit_route(&self) -> Route {
        Route::EditItem {
            token: self.token.clone(),
        }
    }

    /// Commit `action`. Only the action currently offered is accepted.
    pub async fn apply_action(&mut self, action: StatusAction) -> Result<()> {
        let key = self
            .key
            .clone()
            .ok_or_else(|| ConsoleError::not_found(format!("item '{}'", self.token)))?;
        let current = match &self.item {
            Some(item) => item.status(),
            None => return Err(ConsoleError::not_found(format!("item '{}'", key))),
        };
        if available_action(current) != Some(action) {
            return Err(ConsoleError::InvalidTransition {
                from: status_label(current).to_string(),
                to: action.target().label().to_string(),
            });
        }
        let path = item_path(&key)?;

        self.state.busy = true;
        self.state.error = None;
        let result = self
            .context
            .store()
            .update(&path, transition_fields(action.target(), Utc::now()))
            .await;
        self.state.busy = false;

        match result {
            Ok(()) => {
                debug!(%key, to = %action.target(), "Status updated");
                Ok(())
            }
            Err(e) => {
                error!(%key, "Failed to update status: {}", e);
                self.state.error = Some(format!("Failed to update status: {}", e));
                Err(ConsoleError::write(e))
            }
        }
    }

    /// Commit whatever action is currently offered
    pub async fn advance(&mut self) -> Result<StatusAction> {
        let current = self.item.as_ref().and_then(|item| item.status());
        let action = available_action(current).ok_or_else(|| ConsoleError::InvalidTransition {
            from: status_label(current).to_string(),
            to: "a later status".to_string(),
        })?;
        self.apply_action(action).await?;
        Ok(action)
    }
}

#[async_trait::async_trait]
impl LiveView for ItemDetailView {
    fn subscription_mut(&mut self) -> Option<&mut Subscription> {
        self.subscription.as_mut()
    }

    fn take_subscription(&mut self) -> Option<Subscription> {
        self.subscription.take()
    }

    fn apply(&mut self, event: SubscriptionEvent) {
        self.state.loading = false;
        match event {
            Ok(snapshot) => match ItemRecord::from_value(snapshot.value()) {
                Some(record) => {
                    self.not_found = false;
                    self.item = Some(record);
                    if self.state.error.as_deref() == Some(NOT_FOUND_MESSAGE) {
                        self.state.error = None;
                    }
                }
                None => self.mark_not_found(),
            },
            Err(e) => {
                error!(token = %self.token, "Item subscription failed: {}", e);
                self.state.error = Some(format!("Error loading item: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdCodec;
    use crate::status::ItemStatus;
    use lostfound_auth::User;
    use lostfound_realtime::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn context_for(store: &MemoryStore) -> SessionContext {
        SessionContext::new(
            User {
                uid: "uid-1".into(),
                email: None,
                display_name: None,
            },
            Arc::new(store.clone()),
            IdCodec::default(),
        )
    }

    async fn open(store: &MemoryStore, key: &str) -> ItemDetailView {
        let context = context_for(store);
        let token = context.codec().encode(key).unwrap();
        let mut view = ItemDetailView::open(&context, &token).await;
        view.poll();
        view
    }

    #[tokio::test]
    async fn offers_one_action_per_status() {
        let store = MemoryStore::with_data(json!({"items": {
            "lost": {"status_id": 1},
            "found": {"status_id": 2},
            "claimed": {"status_id": 3},
            "odd": {"status_id": 99}
        }}));

        assert_eq!(
            open(&store, "lost").await.offered_action(),
            Some(StatusAction::MarkFound)
        );
        assert_eq!(
            open(&store, "found").await.offered_action(),
            Some(StatusAction::MarkClaimed)
        );
        assert_eq!(open(&store, "claimed").await.offered_action(), None);

        let odd = open(&store, "odd").await;
        assert_eq!(odd.offered_action(), None);
        assert_eq!(odd.item().unwrap().status_label(), "Unknown");
    }

    #[tokio::test]
    async fn refuses_to_skip_a_state() {
        let store = MemoryStore::with_data(json!({"items": {"a": {"status_id": 1}}}));
        let mut view = open(&store, "a").await;

        let err = view.apply_action(StatusAction::MarkClaimed).await.unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::InvalidTransition { ref to, .. } if to == "Claimed"
        ));
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn bad_token_is_not_found() {
        let store = MemoryStore::with_data(json!({"items": {"a": {"status_id": 1}}}));
        let view = ItemDetailView::open(&context_for(&store), "garbage").await;
        assert_eq!(view.status(), DetailStatus::NotFound);
        assert_eq!(view.state().error.as_deref(), Some(NOT_FOUND_MESSAGE));
        assert_eq!(view.back_route(), Route::Items);
        assert_eq!(store.watcher_count(), 0);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        let view = open(&store, "gone").await;
        assert_eq!(view.status(), DetailStatus::NotFound);
    }

    #[tokio::test]
    async fn rejected_update_shows_banner_until_retry_succeeds() {
        let store = MemoryStore::with_data(json!({"items": {"a": {"status_id": 2}}}));
        store.reject_writes(Some("Permission denied"));
        let mut view = open(&store, "a").await;

        assert!(view.advance().await.is_err());
        let banner = view.state().error.clone().unwrap();
        assert!(banner.starts_with("Failed to update status:"));
        assert!(!view.state().busy);
        assert_eq!(view.offered_action(), Some(StatusAction::MarkClaimed));

        store.reject_writes(None);
        view.advance().await.unwrap();
        view.poll();
        assert_eq!(view.item().unwrap().status(), Some(ItemStatus::Claimed));
        assert_eq!(view.state().error, None);
    }
}
