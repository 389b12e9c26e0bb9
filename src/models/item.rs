use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{display_date, lenient_status, lenient_text, or_not_available};
use crate::status::{format_timestamp, status_label, ItemStatus};

/// An item as stored under `items/{key}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// `None` for a missing or unrecognized `status_id`
    #[serde(default, deserialize_with = "lenient_status")]
    pub status_id: Option<ItemStatus>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub updated_at: Option<String>,
}

impl ItemRecord {
    /// Read a pushed value. Anything that is not a JSON object is no record.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        // Every field is optional and lenient, so an object always deserializes.
        serde_json::from_value(value.clone()).ok()
    }

    pub fn status(&self) -> Option<ItemStatus> {
        self.status_id
    }

    pub fn status_label(&self) -> &'static str {
        status_label(self.status_id)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn location_display(&self) -> &str {
        or_not_available(self.location.as_deref())
    }

    pub fn created_display(&self) -> String {
        display_date(self.created_at.as_deref())
    }
}

/// Fields of the item form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    Description,
    Status,
    Location,
    ContactName,
    ContactPhone,
    ContactEmail,
    Image,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::Title,
        FormField::Description,
        FormField::Status,
        FormField::Location,
        FormField::ContactName,
        FormField::ContactPhone,
        FormField::ContactEmail,
        FormField::Image,
    ];

    /// Stored field name
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status_id",
            Self::Location => "location",
            Self::ContactName => "contact_name",
            Self::ContactPhone => "contact_phone",
            Self::ContactEmail => "contact_email",
            Self::Image => "image",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Status => "Status",
            Self::Location => "Location",
            Self::ContactName => "Contact Name",
            Self::ContactPhone => "Contact Phone",
            Self::ContactEmail => "Contact Email",
            Self::Image => "Image",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::Title | Self::Description | Self::ContactName | Self::ContactPhone
        )
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a form could not be submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub missing: Vec<FormField>,
    pub invalid_status: Option<String>,
    pub invalid_email: Option<String>,
}

impl ValidationError {
    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid_status.is_none() && self.invalid_email.is_none()
    }

    /// Fields that need the operator's attention
    pub fn fields(&self) -> Vec<FormField> {
        let mut fields = self.missing.clone();
        if self.invalid_status.is_some() {
            fields.push(FormField::Status);
        }
        if self.invalid_email.is_some() {
            fields.push(FormField::ContactEmail);
        }
        fields
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut problems = Vec::new();
        if !self.missing.is_empty() {
            let names: Vec<&str> = self.missing.iter().map(|m| m.label()).collect();
            problems.push(format!("required: {}", names.join(", ")));
        }
        if let Some(status) = &self.invalid_status {
            problems.push(format!("status '{}' is not Lost, Found or Claimed", status));
        }
        if let Some(email) = &self.invalid_email {
            problems.push(format!("'{}' is not an email address", email));
        }
        f.write_str(&problems.join("; "))
    }
}

impl std::error::Error for ValidationError {}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Editable form state. Every field holds the raw text the operator typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub status: String,
    pub location: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub image: String,
}

impl Default for ItemForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: ItemStatus::Lost.code().to_string(),
            location: String::new(),
            contact_name: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
            image: String::new(),
        }
    }
}

impl ItemForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from a stored record. An unrecognized status leaves the
    /// status blank so the operator has to pick one.
    pub fn from_record(record: &ItemRecord) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            title: text(&record.title),
            description: text(&record.description),
            status: record
                .status_id
                .map(|s| s.code().to_string())
                .unwrap_or_default(),
            location: text(&record.location),
            contact_name: text(&record.contact_name),
            contact_phone: text(&record.contact_phone),
            contact_email: text(&record.contact_email),
            image: text(&record.image),
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::Status => &self.status,
            FormField::Location => &self.location,
            FormField::ContactName => &self.contact_name,
            FormField::ContactPhone => &self.contact_phone,
            FormField::ContactEmail => &self.contact_email,
            FormField::Image => &self.image,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Title => self.title = value,
            FormField::Description => self.description = value,
            FormField::Status => self.status = value,
            FormField::Location => self.location = value,
            FormField::ContactName => self.contact_name = value,
            FormField::ContactPhone => self.contact_phone = value,
            FormField::ContactEmail => self.contact_email = value,
            FormField::Image => self.image = value,
        }
    }

    pub fn set_status(&mut self, status: ItemStatus) {
        self.status = status.code().to_string();
    }

    /// Check the form and produce what will be written
    pub fn validate(&self) -> Result<ItemDraft, ValidationError> {
        let mut error = ValidationError::default();

        for field in FormField::ALL {
            if field.is_required() && self.get(field).trim().is_empty() {
                error.missing.push(field);
            }
        }

        let status = ItemStatus::parse_input(&self.status);
        if status.is_none() {
            error.invalid_status = Some(self.status.trim().to_string());
        }

        let email = self.contact_email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            error.invalid_email = Some(email.to_string());
        }

        match status {
            Some(status) if error.is_empty() => Ok(ItemDraft {
                title: self.title.trim().to_string(),
                description: self.description.trim().to_string(),
                status,
                location: self.location.trim().to_string(),
                contact_name: self.contact_name.trim().to_string(),
                contact_phone: self.contact_phone.trim().to_string(),
                contact_email: email.to_string(),
                image: self.image.trim().to_string(),
            }),
            _ => Err(error),
        }
    }
}

/// A validated form, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub status: ItemStatus,
    pub location: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub image: String,
}

impl ItemDraft {
    fn form_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        let mut put = |field: FormField, value: Value| {
            fields.insert(field.name().to_string(), value);
        };
        put(FormField::Title, Value::from(self.title.as_str()));
        put(FormField::Description, Value::from(self.description.as_str()));
        put(FormField::Status, Value::from(self.status.code()));
        put(FormField::Location, Value::from(self.location.as_str()));
        put(FormField::ContactName, Value::from(self.contact_name.as_str()));
        put(FormField::ContactPhone, Value::from(self.contact_phone.as_str()));
        put(FormField::ContactEmail, Value::from(self.contact_email.as_str()));
        put(FormField::Image, Value::from(self.image.as_str()));
        fields
    }

    /// Document for a new record; `created_at` equals `updated_at`
    pub fn create_fields(&self, at: DateTime<Utc>) -> Map<String, Value> {
        let stamp = format_timestamp(at);
        let mut fields = self.form_fields();
        fields.insert("created_at".to_string(), Value::String(stamp.clone()));
        fields.insert("updated_at".to_string(), Value::String(stamp));
        fields
    }

    /// Partial update for an existing record; `created_at` is left alone
    pub fn update_fields(&self, at: DateTime<Utc>) -> Map<String, Value> {
        let mut fields = self.form_fields();
        fields.insert("updated_at".to_string(), Value::String(format_timestamp(at)));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn filled_form() -> ItemForm {
        let mut form = ItemForm::new();
        form.set(FormField::Title, "Wallet");
        form.set(FormField::Description, "Black leather");
        form.set(FormField::ContactName, "Jo");
        form.set(FormField::ContactPhone, "555-0100");
        form
    }

    #[test]
    fn record_reads_wrong_types_as_absent() {
        let record = ItemRecord::from_value(&json!({
            "title": "Umbrella",
            "status_id": "2",
            "location": "",
            "contact_phone": 5550100,
            "image": null
        }))
        .unwrap();

        assert_eq!(record.title(), "Umbrella");
        assert_eq!(record.status(), None);
        assert_eq!(record.status_label(), "Unknown");
        assert_eq!(record.location_display(), "N/A");
        assert_eq!(record.contact_phone.as_deref(), Some("5550100"));
        assert_eq!(record.created_display(), "N/A");
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(ItemRecord::from_value(&json!(null)).is_none());
        assert!(ItemRecord::from_value(&json!("Wallet")).is_none());
    }

    #[test]
    fn status_99_renders_unknown() {
        let record = ItemRecord::from_value(&json!({"status_id": 99})).unwrap();
        assert_eq!(record.status_label(), "Unknown");
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut form = filled_form();
        form.set(FormField::Title, "   ");
        let err = form.validate().unwrap_err();
        assert_eq!(err.missing, vec![FormField::Title]);
        assert_eq!(err.to_string(), "required: Title");
    }

    #[test]
    fn complete_form_is_accepted_with_integer_status() {
        let mut form = filled_form();
        form.set(FormField::Status, "3");
        let draft = form.validate().unwrap();
        assert_eq!(draft.status, ItemStatus::Claimed);

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let fields = draft.create_fields(at);
        assert_eq!(fields["status_id"], json!(3));
        assert_eq!(fields["created_at"], fields["updated_at"]);
    }

    #[test]
    fn free_form_status_is_rejected() {
        let mut form = filled_form();
        form.set(FormField::Status, "misplaced");
        let err = form.validate().unwrap_err();
        assert_eq!(err.invalid_status.as_deref(), Some("misplaced"));
        assert_eq!(err.fields(), vec![FormField::Status]);
    }

    #[test]
    fn contact_email_must_look_like_an_address() {
        let mut form = filled_form();
        form.set(FormField::ContactEmail, "jo.example.com");
        assert!(form.validate().is_err());

        form.set(FormField::ContactEmail, "jo@example.com");
        assert_eq!(form.validate().unwrap().contact_email, "jo@example.com");

        form.set(FormField::ContactEmail, "");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn edit_prefill_keeps_unknown_status_blank() {
        let record = ItemRecord::from_value(&json!({"title": "Keys", "status_id": 7})).unwrap();
        let form = ItemForm::from_record(&record);
        assert_eq!(form.title, "Keys");
        assert!(form.status.is_empty());
        assert!(form.validate().unwrap_err().invalid_status.is_some());
    }

    #[test]
    fn update_fields_leave_created_at_alone() {
        let draft = filled_form().validate().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let fields = draft.update_fields(at);
        assert!(!fields.contains_key("created_at"));
        assert_eq!(fields["updated_at"], "2024-03-02T09:00:00.000Z");
    }
}
