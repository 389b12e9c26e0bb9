use lostfound_realtime::{Subscription, SubscriptionEvent};
use tracing::{error, warn};

use super::{subscribe_collection, LiveView, ViewState, USERS_PATH};
use crate::error::Result;
use crate::models::{or_not_available, UserRecord};
use crate::session::SessionContext;

pub const EMPTY_MESSAGE: &str = "No users found";

/// Shown in the "Items Posted" column; not tracked per user
pub const ITEMS_POSTED_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub key: String,
    pub record: UserRecord,
}

impl UserRow {
    pub fn name(&self) -> &str {
        self.record.name.as_deref().unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.record.email.as_deref().unwrap_or_default()
    }

    pub fn registered(&self) -> String {
        self.record.registered_display()
    }

    pub fn items_posted(&self) -> &'static str {
        ITEMS_POSTED_PLACEHOLDER
    }

    /// Name, falling back to `"N/A"`
    pub fn display_name(&self) -> &str {
        or_not_available(self.record.name.as_deref())
    }
}

/// The read-only users table
pub struct UsersListView {
    subscription: Option<Subscription>,
    users: Vec<UserRow>,
    state: ViewState,
}

impl UsersListView {
    pub async fn open(context: &SessionContext) -> Result<Self> {
        let subscription = subscribe_collection(context, USERS_PATH).await?;
        Ok(Self {
            subscription: Some(subscription),
            users: Vec::new(),
            state: ViewState::loading(),
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn rows(&self) -> &[UserRow] {
        &self.users
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        (!self.state.loading && self.users.is_empty()).then_some(EMPTY_MESSAGE)
    }
}

#[async_trait::async_trait]
impl LiveView for UsersListView {
    fn subscription_mut(&mut self) -> Option<&mut Subscription> {
        self.subscription.as_mut()
    }

    fn take_subscription(&mut self) -> Option<Subscription> {
        self.subscription.take()
    }

    fn apply(&mut self, event: SubscriptionEvent) {
        self.state.loading = false;
        match event {
            Ok(snapshot) => {
                self.users = snapshot
                    .children()
                    .into_iter()
                    .filter_map(|(key, value)| match UserRecord::from_value(value) {
                        Some(record) => Some(UserRow {
                            key: key.to_string(),
                            record,
                        }),
                        None => {
                            warn!(%key, "Skipping user that is not an object");
                            None
                        }
                    })
                    .collect();
                self.state.error = None;
            }
            Err(e) => {
                error!("Users subscription failed: {}", e);
                self.users.clear();
                self.state.error = Some(format!("Error loading users: {}", e));
            }
        }
    }
}
