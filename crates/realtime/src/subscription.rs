use std::fmt;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::RealtimeError;
use crate::path::StorePath;

/// One push delivered by a subscription: the value, or the reason the
/// channel failed
pub type SubscriptionEvent = Result<Snapshot, RealtimeError>;

/// The full value stored at a path at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Value,
}

impl Snapshot {
    pub fn new(path: StorePath, value: Value) -> Self {
        Self { path, value }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Key of the snapshot location (last path segment)
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// `false` when nothing is stored at the path
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Direct children in key order. Empty for leaves and missing values.
    pub fn children(&self) -> Vec<(&str, &Value)> {
        match &self.value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            _ => Vec::new(),
        }
    }

    /// Decode the value, `None` when it does not exist
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Option<T>, RealtimeError> {
        if !self.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(self.value.clone())?))
    }
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// A standing push subscription on one path.
///
/// The source is cancelled when the subscription is unsubscribed or dropped,
/// whichever happens first.
pub struct Subscription {
    id: String,
    path: StorePath,
    receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    pub fn new<F>(
        path: StorePath,
        receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
        cancel: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path,
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Wait for the next push. `None` once the source has ended.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.receiver.recv().await
    }

    /// Take a push that is already queued without waiting
    pub fn try_next(&mut self) -> Option<SubscriptionEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Cancel the subscription now
    pub fn unsubscribe(mut self) {
        self.cancel_source();
    }

    fn cancel_source(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            debug!("Cancelling subscription {} on '{}'", self.id, self.path);
            cancel();
            self.receiver.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_source();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
