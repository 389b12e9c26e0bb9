use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RealtimeError;
use crate::path::StorePath;
use crate::subscription::Subscription;

/// Operations the console consumes from a realtime document store.
///
/// There are no server-side queries: readers subscribe to a whole collection
/// or a single record and filter locally.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Subscribe to `path`. The current value is delivered first, then every
    /// change until the returned subscription is dropped.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RealtimeError>;

    /// Append `value` under `collection` and return the key the store assigned
    async fn push(&self, collection: &StorePath, value: Value) -> Result<String, RealtimeError>;

    /// Overwrite the named fields of the record at `path`, leaving others untouched
    async fn update(&self, path: &StorePath, fields: Map<String, Value>)
        -> Result<(), RealtimeError>;

    /// Delete whatever is stored at `path`
    async fn remove(&self, path: &StorePath) -> Result<(), RealtimeError>;

    /// Token attached to subsequent requests; `None` drops it
    async fn set_auth(&self, token: Option<String>);
}
