//! Realtime document store client for the lost & found console
//!
//! This crate provides the store operations the console consumes
//! (push subscriptions, append, partial update, delete) behind the
//! [`RealtimeStore`] trait, with an in-process and a REST implementation.

mod error;
mod memory;
mod message;
mod path;
mod rest;
mod store;
mod subscription;
pub mod tree;

pub use error::RealtimeError;
pub use memory::{MemoryStore, WriteOp};
pub use message::{EventStreamDecoder, RawEvent, ServerEvent};
pub use path::{validate_key, PushIdGenerator, StorePath};
pub use rest::RestStore;
pub use store::RealtimeStore;
pub use subscription::{Snapshot, Subscription, SubscriptionEvent};
