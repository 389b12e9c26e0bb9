use std::fmt;
use std::sync::Mutex;

use rand::Rng;

use crate::error::RealtimeError;

const MAX_KEY_BYTES: usize = 768;

/// Alphabet used for push keys. Ordered by ASCII value so keys sort by creation time.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Checks that `key` is usable as a single path segment in the store.
pub fn validate_key(key: &str) -> Result<(), RealtimeError> {
    if key.is_empty() {
        return Err(RealtimeError::invalid_path("empty key"));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(RealtimeError::invalid_path(format!(
            "key longer than {} bytes",
            MAX_KEY_BYTES
        )));
    }
    if let Some(c) = key
        .chars()
        .find(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
    {
        return Err(RealtimeError::invalid_path(format!(
            "key {:?} contains forbidden character {:?}",
            key, c
        )));
    }
    Ok(())
}

/// A validated, slash separated location in the document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path such as `items/-Nabc123`. Leading and trailing slashes are ignored.
    pub fn parse(path: &str) -> Result<Self, RealtimeError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            validate_key(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// The path of a direct child
    pub fn child(&self, key: &str) -> Result<Self, RealtimeError> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` equals `other` or lies above it
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when a write at one path can change the value seen at the other
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl std::str::FromStr for StorePath {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Generates 20 character push keys: 8 characters of millisecond timestamp
/// followed by 12 random characters. Keys created within the same
/// millisecond increment the random part, so they still sort in creation order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last: Mutex<Option<(i64, [u8; 12])>>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&self, now_ms: i64) -> String {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let random = match *last {
            Some((last_ms, mut previous)) if last_ms == now_ms => {
                for digit in previous.iter_mut().rev() {
                    if *digit == 63 {
                        *digit = 0;
                    } else {
                        *digit += 1;
                        break;
                    }
                }
                previous
            }
            _ => {
                let mut rng = rand::thread_rng();
                let mut fresh = [0u8; 12];
                for digit in fresh.iter_mut() {
                    *digit = rng.gen_range(0..64);
                }
                fresh
            }
        };
        *last = Some((now_ms, random));

        let mut id = String::with_capacity(20);
        let mut ts = now_ms.max(0);
        let mut time_chars = [0u8; 8];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend(time_chars.iter().map(|&b| b as char));
        id.extend(random.iter().map(|&d| PUSH_CHARS[d as usize] as char));
        id
    }
}
