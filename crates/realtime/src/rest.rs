use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, trace, warn};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};
use url::Url;

use crate::error::RealtimeError;
use crate::message::{EventStreamDecoder, ServerEvent};
use crate::path::StorePath;
use crate::store::RealtimeStore;
use crate::subscription::{Snapshot, Subscription, SubscriptionEvent};
use crate::tree;

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Client for a hosted realtime database over its REST interface.
///
/// Writes are plain JSON requests on `{path}.json`; subscriptions keep a
/// `text/event-stream` response open and rebuild the subscribed value from
/// the `put` and `patch` events it carries.
///
/// Event streams go through their own client. A stream lives as long as its
/// subscription, so that client must not carry a total request timeout.
#[derive(Clone)]
pub struct RestStore {
    base_url: Url,
    http_client: Client,
    stream_client: Client,
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestStore {
    pub fn new(url: &str, http_client: Client) -> Result<Self, RealtimeError> {
        let mut base_url = Url::parse(url)?;
        if base_url.cannot_be_a_base() {
            return Err(RealtimeError::invalid_path(format!(
                "database URL {} cannot be used as a base",
                url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            stream_client: http_client.clone(),
            http_client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Open event streams with `client` instead of the write client
    pub fn with_stream_client(mut self, client: Client) -> Self {
        self.stream_client = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// REST location of `path`, with the auth token attached when one is set
    pub async fn url_for(&self, path: &StorePath) -> Result<Url, RealtimeError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RealtimeError::invalid_path("database URL cannot be a base"))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{}.json", last));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        if let Some(token) = self.access_token.read().await.as_ref() {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, RealtimeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RealtimeError::PermissionDenied(message))
        }
        _ => Err(RealtimeError::RequestRejected {
            status: status.as_u16(),
            message,
        }),
    }
}

fn relative_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

async fn pump_events(
    path: StorePath,
    response: Response,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
) {
    let mut cache = Value::Null;
    let mut decoder = EventStreamDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Event stream for '{}' failed: {}", path, e);
                let _ = sender.send(Err(e.into()));
                return;
            }
        };

        for raw in decoder.feed(&chunk) {
            let event = match ServerEvent::parse(&raw) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Unreadable '{}' event on '{}': {}", raw.event, path, e);
                    let _ = sender.send(Err(e));
                    continue;
                }
            };
            match event {
                ServerEvent::Put { path: relative, data } => {
                    tree::set_at(&mut cache, &relative_segments(&relative), data);
                }
                ServerEvent::Patch { path: relative, data } => {
                    tree::merge_at(&mut cache, &relative_segments(&relative), data);
                }
                ServerEvent::KeepAlive => {
                    trace!("keep-alive on '{}'", path);
                    continue;
                }
                ServerEvent::Cancel(reason) => {
                    warn!("Server cancelled stream on '{}': {}", path, reason);
                    let _ = sender.send(Err(RealtimeError::PermissionDenied(reason)));
                    return;
                }
                ServerEvent::AuthRevoked => {
                    warn!("Auth revoked for stream on '{}'", path);
                    let _ = sender.send(Err(RealtimeError::AuthRevoked));
                    return;
                }
                ServerEvent::Unknown(name) => {
                    debug!("Ignoring unknown event '{}' on '{}'", name, path);
                    continue;
                }
            }
            if sender
                .send(Ok(Snapshot::new(path.clone(), cache.clone())))
                .is_err()
            {
                debug!("Subscriber for '{}' went away", path);
                return;
            }
        }
    }
    debug!("Event stream for '{}' ended", path);
}

#[async_trait]
impl RealtimeStore for RestStore {
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RealtimeError> {
        let url = self.url_for(path).await?;
        info!("Opening event stream on '{}'", path);
        let response = self
            .stream_client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(pump_events(path.clone(), response, sender));
        Ok(Subscription::new(path.clone(), receiver, move || {
            handle.abort();
        }))
    }

    async fn push(&self, collection: &StorePath, value: Value) -> Result<String, RealtimeError> {
        let url = self.url_for(collection).await?;
        let response = self.http_client.post(url).json(&value).send().await?;
        let created: PushResponse = ensure_success(response).await?.json().await?;
        debug!("Store assigned key '{}' under '{}'", created.name, collection);
        Ok(created.name)
    }

    async fn update(
        &self,
        path: &StorePath,
        fields: Map<String, Value>,
    ) -> Result<(), RealtimeError> {
        let url = self.url_for(path).await?;
        let response = self.http_client.patch(url).json(&fields).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), RealtimeError> {
        let url = self.url_for(path).await?;
        let response = self.http_client.delete(url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn set_auth(&self, token: Option<String>) {
        info!("Setting store auth token (is_some: {})", token.is_some());
        *self.access_token.write().await = token;
    }
}
