//! Error handling for the lost & found console

use std::fmt;
use thiserror::Error;

use crate::codec::CodecError;
use crate::models::ValidationError;

/// Unified error type for console operations
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// A push subscription could not be opened or failed while open
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// The requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The store rejected a create, update or delete
    #[error("Write error: {0}")]
    Write(String),

    /// A URL token that does not decode to a record key
    #[error("Decode error: {0}")]
    Decode(#[from] CodecError),

    /// Form input failed the shape checks
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A status change other than the one currently offered
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Sign-in, refresh or sign-out failed
    #[error("Authentication error: {0}")]
    Auth(#[from] lostfound_auth::AuthError),

    /// An operation that needs a signed-in operator was attempted without one
    #[error("Not signed in")]
    NotSignedIn,

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl ConsoleError {
    /// Create a new subscription error
    pub fn subscription<T: fmt::Display>(msg: T) -> Self {
        ConsoleError::Subscription(msg.to_string())
    }

    /// Create a new not-found error for the named record
    pub fn not_found<T: fmt::Display>(what: T) -> Self {
        ConsoleError::NotFound(what.to_string())
    }

    /// Create a new write error
    pub fn write<T: fmt::Display>(msg: T) -> Self {
        ConsoleError::Write(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        ConsoleError::Config(msg.to_string())
    }

    /// Undecodable tokens count as missing records
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound(_) | ConsoleError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
