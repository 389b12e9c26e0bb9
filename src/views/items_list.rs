use std::fmt;
use std::str::FromStr;

use lostfound_realtime::{Subscription, SubscriptionEvent};
use tracing::{debug, error, warn};

use super::{item_path, subscribe_collection, LiveView, ViewState, ITEMS_PATH};
use crate::error::{ConsoleError, Result};
use crate::models::ItemRecord;
use crate::routes::Route;
use crate::session::SessionContext;
use crate::status::{ItemStatus, UNKNOWN_LABEL};

pub const EMPTY_MESSAGE: &str = "No items found";

/// One line of the items table
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub key: String,
    /// Address token for `key`; `None` when the key cannot be encoded
    pub token: Option<String>,
    pub record: ItemRecord,
}

impl ItemRow {
    pub fn title(&self) -> &str {
        self.record.title()
    }

    pub fn status_label(&self) -> &'static str {
        self.record.status_label()
    }

    pub fn location(&self) -> &str {
        self.record.location_display()
    }

    pub fn contact(&self) -> &str {
        self.record.contact_name.as_deref().unwrap_or_default()
    }

    pub fn date(&self) -> String {
        self.record.created_display()
    }

    pub fn view_route(&self) -> Option<Route> {
        self.token
            .clone()
            .map(|token| Route::ItemDetail { token })
    }

    pub fn edit_route(&self) -> Option<Route> {
        self.token.clone().map(|token| Route::EditItem { token })
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.record.title,
            &self.record.description,
            &self.record.location,
            &self.record.contact_name,
        ]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
    }
}

/// Client-side status filter of the items table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Only(ItemStatus),
    /// Records whose status is missing or unrecognized
    Unknown,
}

impl StatusFilter {
    fn accepts(self, status: Option<ItemStatus>) -> bool {
        match self {
            StatusFilter::Only(wanted) => status == Some(wanted),
            StatusFilter::Unknown => status.is_none(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(UNKNOWN_LABEL) {
            return Ok(StatusFilter::Unknown);
        }
        ItemStatus::parse_input(s)
            .map(StatusFilter::Only)
            .ok_or_else(|| format!("'{}' is not lost, found, claimed or unknown", s))
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::Only(status) => write!(f, "{}", status),
            StatusFilter::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

/// The items table with its delete confirmation
pub struct ItemsListView {
    context: SessionContext,
    subscription: Option<Subscription>,
    items: Vec<ItemRow>,
    state: ViewState,
    filter: Option<StatusFilter>,
    search: String,
    pending_delete: Option<String>,
}

impl ItemsListView {
    /// Open the screen and subscribe to the whole collection
    pub async fn open(context: &SessionContext) -> Result<Self> {
        let subscription = subscribe_collection(context, ITEMS_PATH).await?;
        Ok(Self {
            context: context.clone(),
            subscription: Some(subscription),
            items: Vec::new(),
            state: ViewState::loading(),
            filter: None,
            search: String::new(),
            pending_delete: None,
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Every record, in key order
    pub fn all(&self) -> &[ItemRow] {
        &self.items
    }

    /// Records passing the status filter and search
    pub fn rows(&self) -> Vec<&ItemRow> {
        let needle = self.search.trim().to_lowercase();
        self.items
            .iter()
            .filter(|row| match self.filter {
                Some(filter) => filter.accepts(row.record.status()),
                None => true,
            })
            .filter(|row| needle.is_empty() || row.matches(&needle))
            .collect()
    }

    /// Text shown instead of the table, once loaded
    pub fn empty_message(&self) -> Option<&'static str> {
        (!self.state.loading && self.rows().is_empty()).then_some(EMPTY_MESSAGE)
    }

    pub fn set_status_filter(&mut self, filter: Option<StatusFilter>) {
        self.filter = filter;
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
    }

    pub fn find(&self, key: &str) -> Option<&ItemRow> {
        self.items.iter().find(|row| row.key == key)
    }

    /// First step of deletion: ask the operator to confirm
    pub fn request_delete(&mut self, key: &str) -> Result<()> {
        if self.find(key).is_none() {
            return Err(ConsoleError::not_found(format!("item '{}'", key)));
        }
        self.pending_delete = Some(key.to_string());
        Ok(())
    }

    /// The row awaiting confirmation
    pub fn pending_delete(&self) -> Option<&ItemRow> {
        self.pending_delete.as_deref().and_then(|key| self.find(key))
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the record awaiting confirmation. The table updates when the
    /// store pushes the removal.
    pub async fn confirm_delete(&mut self) -> Result<()> {
        let key = self
            .pending_delete
            .take()
            .ok_or_else(|| ConsoleError::write("no deletion awaiting confirmation"))?;
        let path = item_path(&key)?;

        self.state.busy = true;
        let result = self.context.store().remove(&path).await;
        self.state.busy = false;

        match result {
            Ok(()) => {
                debug!(%key, "Item deleted");
                Ok(())
            }
            Err(e) => {
                error!(%key, "Error deleting item: {}", e);
                self.state.error = Some(format!("Error deleting item: {}", e));
                Err(ConsoleError::write(e))
            }
        }
    }

    fn row_for(&self, key: &str, record: ItemRecord) -> ItemRow {
        let token = match self.context.codec().encode(key) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(%key, "Cannot build address for item: {}", e);
                None
            }
        };
        ItemRow {
            key: key.to_string(),
            token,
            record,
        }
    }
}

#[async_trait::async_trait]
impl LiveView for ItemsListView {
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
                let mut rows = Vec::new();
                for (key, value) in snapshot.children() {
                    match ItemRecord::from_value(value) {
                        Some(record) => rows.push(self.row_for(key, record)),
                        None => warn!(%key, "Skipping item that is not an object"),
                    }
                }
                self.items = rows;
                self.state.error = None;
                let removed = self
                    .pending_delete
                    .as_deref()
                    .map_or(false, |key| self.find(key).is_none());
                if removed {
                    self.pending_delete = None;
                }
            }
            Err(e) => {
                error!("Items subscription failed: {}", e);
                self.items.clear();
                self.state.error = Some(format!("Error loading items: {}", e));
            }
        }
    }
}

impl fmt::Debug for ItemsListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsListView")
            .field("items", &self.items.len())
            .field("state", &self.state)
            .field("filter", &self.filter)
            .field("pending_delete", &self.pending_delete)
            .finish()
    }
}
