use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{display_date, lenient_text};

/// A registered user as stored under `users/{key}`. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
}

impl UserRecord {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn registered_display(&self) -> String {
        display_date(self.created_at.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_numeric_registration_time() {
        let user = UserRecord::from_value(&json!({
            "name": "Ada",
            "email": "ada@example.com",
            "created_at": 1709296200000i64
        }))
        .unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.registered_display(), "2024-03-01");
    }
}
