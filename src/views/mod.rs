//! Screen controllers.
//!
//! Each screen is a plain struct holding what a front-end renders. Screens
//! that show live data own exactly one [`Subscription`]; closing or dropping
//! the screen cancels it.

mod dashboard;
mod item_detail;
mod item_form;
mod items_list;
mod nav;
mod stats;
mod users_list;

pub use dashboard::{dashboard_entries, DashboardEntry};
pub use item_detail::{DetailStatus, ItemDetailView, NOT_FOUND_MESSAGE};
pub use item_form::{FormMode, ItemFormView};
pub use items_list::{ItemRow, ItemsListView, StatusFilter};
pub use nav::{logout, nav_links, NavLink};
pub use stats::{StatsView, StatusCounts};
pub use users_list::{UserRow, UsersListView};

use async_trait::async_trait;
use lostfound_realtime::{StorePath, Subscription, SubscriptionEvent};

use crate::error::{ConsoleError, Result};
use crate::session::SessionContext;

pub const ITEMS_PATH: &str = "items";
pub const USERS_PATH: &str = "users";

/// Loading indicator, write-in-progress flag and error banner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub loading: bool,
    pub busy: bool,
    pub error: Option<String>,
}

impl ViewState {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

/// Location of the item stored under `key`
pub fn item_path(key: &str) -> Result<StorePath> {
    StorePath::parse(ITEMS_PATH)
        .and_then(|items| items.child(key))
        .map_err(|e| ConsoleError::not_found(format!("item '{}' ({})", key, e)))
}

/// Record key and store location behind an address token.
///
/// A token that does not decode fails with [`ConsoleError::Decode`], which
/// callers treat as a missing record.
pub fn locate_item(context: &SessionContext, token: &str) -> Result<(String, StorePath)> {
    let key = context.codec().decode(token)?;
    let path = item_path(&key)?;
    Ok((key, path))
}

async fn subscribe(context: &SessionContext, path: &StorePath) -> Result<Subscription> {
    context
        .store()
        .subscribe(path)
        .await
        .map_err(ConsoleError::subscription)
}

async fn subscribe_collection(context: &SessionContext, name: &str) -> Result<Subscription> {
    let path = StorePath::parse(name).map_err(ConsoleError::subscription)?;
    subscribe(context, &path).await
}

/// A screen fed by a push subscription
#[async_trait]
pub trait LiveView: Send {
    fn subscription_mut(&mut self) -> Option<&mut Subscription>;

    fn take_subscription(&mut self) -> Option<Subscription>;

    /// Fold one push into the screen
    fn apply(&mut self, event: SubscriptionEvent);

    /// Apply every push already queued. Returns how many were applied.
    fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription_mut().and_then(|s| s.try_next()) {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next push and apply it. `false` once the source has ended.
    async fn refresh(&mut self) -> bool {
        let event = match self.subscription_mut() {
            Some(subscription) => subscription.next().await,
            None => return false,
        };
        match event {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    fn is_live(&mut self) -> bool {
        self.subscription_mut().is_some()
    }

    /// Cancel the subscription. Dropping the screen does the same.
    fn close(&mut self) {
        if let Some(subscription) = self.take_subscription() {
            subscription.unsubscribe();
        }
    }
}
