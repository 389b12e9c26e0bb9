use lostfound_realtime::{Subscription, SubscriptionEvent};
use serde::Serialize;
use tracing::error;

use super::{subscribe_collection, LiveView, ViewState, ITEMS_PATH};
use crate::error::Result;
use crate::models::ItemRecord;
use crate::session::SessionContext;
use crate::status::ItemStatus;

/// Item counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub lost: usize,
    pub found: usize,
    pub claimed: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.lost + self.found + self.claimed + self.unknown
    }

    pub fn count(&self, status: Option<ItemStatus>) -> usize {
        match status {
            Some(ItemStatus::Lost) => self.lost,
            Some(ItemStatus::Found) => self.found,
            Some(ItemStatus::Claimed) => self.claimed,
            None => self.unknown,
        }
    }

    fn add(&mut self, status: Option<ItemStatus>) {
        match status {
            Some(ItemStatus::Lost) => self.lost += 1,
            Some(ItemStatus::Found) => self.found += 1,
            Some(ItemStatus::Claimed) => self.claimed += 1,
            None => self.unknown += 1,
        }
    }
}

/// Live counts over the items collection
pub struct StatsView {
    subscription: Option<Subscription>,
    counts: StatusCounts,
    state: ViewState,
}

impl StatsView {
    pub async fn open(context: &SessionContext) -> Result<Self> {
        let subscription = subscribe_collection(context, ITEMS_PATH).await?;
        Ok(Self {
            subscription: Some(subscription),
            counts: StatusCounts::default(),
            state: ViewState::loading(),
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }
}

#[async_trait::async_trait]
impl LiveView for StatsView {
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
                let mut counts = StatusCounts::default();
                for (_, value) in snapshot.children() {
                    if let Some(record) = ItemRecord::from_value(value) {
                        counts.add(record.status());
                    }
                }
                self.counts = counts;
                self.state.error = None;
            }
            Err(e) => {
                error!("Statistics subscription failed: {}", e);
                self.state.error = Some(format!("Error loading statistics: {}", e));
            }
        }
    }
}
