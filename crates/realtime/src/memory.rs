use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, trace, warn};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::RealtimeError;
use crate::path::{PushIdGenerator, StorePath};
use crate::store::RealtimeStore;
use crate::subscription::{Snapshot, Subscription, SubscriptionEvent};
use crate::tree;

/// A write received by a [`MemoryStore`], in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { path: StorePath, value: Value },
    Push { path: StorePath, value: Value },
    Update { path: StorePath, fields: Map<String, Value> },
    Remove { path: StorePath },
}

impl WriteOp {
    pub fn path(&self) -> &StorePath {
        match self {
            Self::Set { path, .. }
            | Self::Push { path, .. }
            | Self::Update { path, .. }
            | Self::Remove { path } => path,
        }
    }
}

struct Watcher {
    path: StorePath,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
}

#[derive(Default)]
struct Inner {
    root: Value,
    watchers: HashMap<u64, Watcher>,
    next_watcher: u64,
    journal: Vec<WriteOp>,
    rejection: Option<String>,
    auth_token: Option<String>,
}

impl Inner {
    fn value_at(&self, path: &StorePath) -> Value {
        tree::get_at(&self.root, path.segments())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn notify(&mut self, written: &StorePath) {
        let mut closed = Vec::new();
        for (id, watcher) in &self.watchers {
            if !watcher.path.overlaps(written) {
                continue;
            }
            let snapshot = Snapshot::new(watcher.path.clone(), self.value_at(&watcher.path));
            if watcher.sender.send(Ok(snapshot)).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            trace!("Dropping closed watcher {}", id);
            self.watchers.remove(&id);
        }
    }

    fn check_writable(&self) -> Result<(), RealtimeError> {
        match &self.rejection {
            Some(reason) => Err(RealtimeError::PermissionDenied(reason.clone())),
            None => Ok(()),
        }
    }
}

/// An in-process document store with the same push semantics as the hosted one.
///
/// Watchers are notified synchronously on every write that overlaps their
/// path, so a test can write and then read the resulting push without sleeping.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    ids: Arc<PushIdGenerator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `root`
    pub fn with_data(root: Value) -> Self {
        let store = Self::new();
        store.lock().root = tree::normalize(root);
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace the value at `path` and notify watchers
    pub fn set(&self, path: &StorePath, value: Value) {
        let mut inner = self.lock();
        tree::set_at(&mut inner.root, path.segments(), value.clone());
        inner.journal.push(WriteOp::Set {
            path: path.clone(),
            value,
        });
        inner.notify(path);
    }

    pub fn value_at(&self, path: &StorePath) -> Value {
        self.lock().value_at(path)
    }

    /// Every write received so far
    pub fn journal(&self) -> Vec<WriteOp> {
        self.lock().journal.clone()
    }

    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    pub fn auth_token(&self) -> Option<String> {
        self.lock().auth_token.clone()
    }

    /// Make every following write fail with `PermissionDenied`, or accept writes again
    pub fn reject_writes(&self, reason: Option<&str>) {
        self.lock().rejection = reason.map(String::from);
    }

    /// Deliver an error to every watcher overlapping `path`, as a failing push channel would
    pub fn fail_subscriptions(&self, path: &StorePath, reason: &str) {
        let inner = self.lock();
        for watcher in inner.watchers.values() {
            if watcher.path.overlaps(path) {
                let _ = watcher
                    .sender
                    .send(Err(RealtimeError::subscription(reason)));
            }
        }
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RealtimeError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.lock();
            let id = inner.next_watcher;
            inner.next_watcher += 1;
            let initial = Snapshot::new(path.clone(), inner.value_at(path));
            // The receiver is still held here, so the initial push cannot fail.
            let _ = sender.send(Ok(initial));
            inner.watchers.insert(
                id,
                Watcher {
                    path: path.clone(),
                    sender,
                },
            );
            id
        };
        debug!("Watcher {} subscribed to '{}'", id, path);

        let registry = self.inner.clone();
        Ok(Subscription::new(path.clone(), receiver, move || {
            let mut inner = match registry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            inner.watchers.remove(&id);
        }))
    }

    async fn push(&self, collection: &StorePath, value: Value) -> Result<String, RealtimeError> {
        let key = self.ids.next_id();
        let path = collection.child(&key)?;
        let mut inner = self.lock();
        inner.check_writable()?;
        tree::set_at(&mut inner.root, path.segments(), value.clone());
        inner.journal.push(WriteOp::Push {
            path: path.clone(),
            value,
        });
        inner.notify(&path);
        debug!("Pushed new record at '{}'", path);
        Ok(key)
    }

    async fn update(
        &self,
        path: &StorePath,
        fields: Map<String, Value>,
    ) -> Result<(), RealtimeError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        tree::merge_at(&mut inner.root, path.segments(), fields.clone());
        inner.journal.push(WriteOp::Update {
            path: path.clone(),
            fields,
        });
        inner.notify(path);
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), RealtimeError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if tree::get_at(&inner.root, path.segments()).is_none() {
            warn!("Removing '{}' which holds no value", path);
        }
        tree::set_at(&mut inner.root, path.segments(), Value::Null);
        inner.journal.push(WriteOp::Remove { path: path.clone() });
        inner.notify(path);
        Ok(())
    }

    async fn set_auth(&self, token: Option<String>) {
        self.lock().auth_token = token;
    }
}
