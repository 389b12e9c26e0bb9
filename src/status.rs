//! Item lifecycle: lost, then found, then claimed.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label shown for a missing or unrecognized status
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Stored as the integer `status_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ItemStatus {
    Lost,
    Found,
    Claimed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [ItemStatus::Lost, ItemStatus::Found, ItemStatus::Claimed];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Lost),
            2 => Some(Self::Found),
            3 => Some(Self::Claimed),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Lost => 1,
            Self::Found => 2,
            Self::Claimed => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lost => "Lost",
            Self::Found => "Found",
            Self::Claimed => "Claimed",
        }
    }

    /// The single forward step, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lost => Some(Self::Found),
            Self::Found => Some(Self::Claimed),
            Self::Claimed => None,
        }
    }

    /// Parse form or command-line input: a code (`"2"`) or a label (`"found"`)
    pub fn parse_input(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(code) = input.parse::<i64>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(input))
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i64> for ItemStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown status code {}", code))
    }
}

impl From<ItemStatus> for i64 {
    fn from(status: ItemStatus) -> Self {
        status.code()
    }
}

/// Label for a status as stored, `"Unknown"` for anything unrecognized
pub fn status_label(status: Option<ItemStatus>) -> &'static str {
    status.map(ItemStatus::label).unwrap_or(UNKNOWN_LABEL)
}

/// The operator shortcut offered on the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    MarkFound,
    MarkClaimed,
}

impl StatusAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::MarkFound => "Mark as Found",
            Self::MarkClaimed => "Mark as Claimed",
        }
    }

    pub fn target(self) -> ItemStatus {
        match self {
            Self::MarkFound => ItemStatus::Found,
            Self::MarkClaimed => ItemStatus::Claimed,
        }
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Action offered for a record in `current`. Claimed and unknown records get none.
pub fn available_action(current: Option<ItemStatus>) -> Option<StatusAction> {
    match current? {
        ItemStatus::Lost => Some(StatusAction::MarkFound),
        ItemStatus::Found => Some(StatusAction::MarkClaimed),
        ItemStatus::Claimed => None,
    }
}

/// Stored timestamp format: RFC 3339, UTC, millisecond precision
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Partial update committing a move to `target`
pub fn transition_fields(target: ItemStatus, at: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status_id".to_string(), Value::from(target.code()));
    fields.insert("updated_at".to_string(), Value::String(format_timestamp(at)));
    fields
}
