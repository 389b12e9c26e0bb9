use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{item_path, locate_item, subscribe, ViewState, ITEMS_PATH};
use crate::error::{ConsoleError, Result};
use crate::models::{FormField, ItemForm, ItemRecord, ValidationError};
use crate::routes::Route;
use crate::session::SessionContext;
use crate::views::item_detail::NOT_FOUND_MESSAGE;
use lostfound_realtime::StorePath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { key: String },
}

/// The create/edit form
pub struct ItemFormView {
    context: SessionContext,
    mode: FormMode,
    form: ItemForm,
    state: ViewState,
    not_found: bool,
    validation: Option<ValidationError>,
}

impl ItemFormView {
    /// An empty form; status starts as Lost
    pub fn create(context: &SessionContext) -> Self {
        Self {
            context: context.clone(),
            mode: FormMode::Create,
            form: ItemForm::new(),
            state: ViewState::default(),
            not_found: false,
            validation: None,
        }
    }

    /// A form prefilled from the record behind `token`.
    ///
    /// The record is read once through a subscription that is dropped as soon
    /// as the first value arrives.
    pub async fn edit(context: &SessionContext, token: &str) -> Self {
        let mut view = Self::create(context);
        view.state.loading = true;

        let (key, path) = match locate_item(context, token) {
            Ok(located) => located,
            Err(e) => {
                warn!(%token, "Unreadable item token: {}", e);
                view.fail_not_found();
                return view;
            }
        };
        view.mode = FormMode::Edit { key };

        let first = match subscribe(context, &path).await {
            Ok(mut subscription) => subscription.next().await,
            Err(e) => {
                view.fail_loading(e);
                return view;
            }
        };
        view.state.loading = false;

        match first {
            Some(Ok(snapshot)) => match ItemRecord::from_value(snapshot.value()) {
                Some(record) => view.form = ItemForm::from_record(&record),
                None => view.fail_not_found(),
            },
            Some(Err(e)) => view.fail_loading(e),
            None => view.fail_loading("subscription ended before any value"),
        }
        view
    }

    fn fail_not_found(&mut self) {
        self.state.loading = false;
        self.not_found = true;
        self.state.error = Some(NOT_FOUND_MESSAGE.to_string());
    }

    fn fail_loading(&mut self, e: impl std::fmt::Display) {
        error!("Error loading item: {}", e);
        self.state.loading = false;
        self.state.error = Some(format!("Error loading item: {}", e));
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add New Item",
            FormMode::Edit { .. } => "Edit Item",
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    pub fn form(&self) -> &ItemForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ItemForm {
        &mut self.form
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    /// Problems found by the last submit
    pub fn validation(&self) -> Option<&ValidationError> {
        self.validation.as_ref()
    }

    pub fn cancel(&self) -> Route {
        Route::Items
    }

    /// Validate and write the form. On success returns where to go next,
    /// along with the record key.
    pub async fn submit(&mut self) -> Result<(Route, String)> {
        if self.not_found {
            return Err(ConsoleError::not_found("item"));
        }
        if self.state.busy {
            return Err(ConsoleError::write("a save is already in progress"));
        }

        let draft = match self.form.validate() {
            Ok(draft) => {
                self.validation = None;
                draft
            }
            Err(e) => {
                self.validation = Some(e.clone());
                return Err(ConsoleError::Validation(e));
            }
        };

        let target = match &self.mode {
            FormMode::Create => StorePath::parse(ITEMS_PATH).map_err(ConsoleError::write)?,
            FormMode::Edit { key } => item_path(key)?,
        };

        self.state.busy = true;
        self.state.error = None;
        let now = Utc::now();
        let store = self.context.store();
        let result = match &self.mode {
            FormMode::Create => {
                store
                    .push(&target, Value::Object(draft.create_fields(now)))
                    .await
            }
            FormMode::Edit { key } => store
                .update(&target, draft.update_fields(now))
                .await
                .map(|()| key.clone()),
        };
        self.state.busy = false;

        match result {
            Ok(key) => {
                info!(%key, "Item saved");
                Ok((Route::Items, key))
            }
            Err(e) => {
                error!("Error saving item: {}", e);
                self.state.error = Some(format!("Error saving item: {}", e));
                Err(ConsoleError::write(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdCodec;
    use crate::status::ItemStatus;
    use lostfound_auth::User;
    use lostfound_realtime::{MemoryStore, WriteOp};
    use serde_json::json;
    use std::sync::Arc;

    fn context_for(store: &MemoryStore) -> SessionContext {
        SessionContext::new(
            User {
                uid: "uid-1".into(),
                email: None,
                display_name: None,
            },
            Arc::new(store.clone()),
            IdCodec::default(),
        )
    }

    #[tokio::test]
    async fn empty_title_never_reaches_store() {
        let store = MemoryStore::new();
        let mut view = ItemFormView::create(&context_for(&store));
        view.set(FormField::Description, "Black leather");
        view.set(FormField::ContactName, "Jo");
        view.set(FormField::ContactPhone, "555-0100");

        let err = view.submit().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(view.validation().unwrap().fields(), vec![FormField::Title]);
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn edit_loads_once_and_releases_subscription() {
        let store = MemoryStore::with_data(json!({"items": {"k1": {
            "title": "Keys", "description": "Three keys", "status_id": 2,
            "contact_name": "Sam", "contact_phone": "555-0101",
            "created_at": "2024-03-01T09:00:00.000Z"
        }}}));
        let context = context_for(&store);
        let token = context.codec().encode("k1").unwrap();

        let mut view = ItemFormView::edit(&context, &token).await;
        assert_eq!(store.watcher_count(), 0);
        assert_eq!(view.heading(), "Edit Item");
        assert_eq!(view.form().title, "Keys");

        view.form_mut().set_status(ItemStatus::Lost);
        let (route, key) = view.submit().await.unwrap();
        assert_eq!(route, Route::Items);
        assert_eq!(key, "k1");

        let record = store.value_at(&item_path("k1").unwrap());
        assert_eq!(record["status_id"], 1);
        assert_eq!(record["created_at"], "2024-03-01T09:00:00.000Z");
        assert_ne!(record["updated_at"], record["created_at"]);
        assert!(matches!(store.journal()[0], WriteOp::Update { .. }));
    }

    #[tokio::test]
    async fn edit_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let context = context_for(&store);
        let token = context.codec().encode("nope").unwrap();
        let mut view = ItemFormView::edit(&context, &token).await;
        assert!(view.is_not_found());
        assert_eq!(view.state().error.as_deref(), Some("Item not found"));
        assert!(view.submit().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rejected_save_keeps_form_for_retry() {
        let store = MemoryStore::new();
        store.reject_writes(Some("Permission denied"));
        let mut view = ItemFormView::create(&context_for(&store));
        view.set(FormField::Title, "Wallet");
        view.set(FormField::Description, "Black leather");
        view.set(FormField::ContactName, "Jo");
        view.set(FormField::ContactPhone, "555-0100");

        assert!(matches!(view.submit().await, Err(ConsoleError::Write(_))));
        assert!(view
            .state()
            .error
            .as_deref()
            .unwrap()
            .starts_with("Error saving item:"));
        assert!(!view.state().busy);
        assert_eq!(view.form().title, "Wallet");

        store.reject_writes(None);
        assert!(view.submit().await.is_ok());
        assert!(view.state().error.is_none());
    }
}
