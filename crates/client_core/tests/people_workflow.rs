use std::sync::{Arc, Mutex};

use client_core::{
    AlertDismissal, Collaborators, DefaultTexts, DetailView, EditSessionController,
    EntityCollection, ListView, MemoryCollection, MemoryMessageChannel, Notifier,
    SelectionController, SessionSettings, SortFilterController,
};
use shared::{
    domain::{EntityHandle, PersonField, SortOrder},
    protocol::{Sorter, UpdateGroup},
};

#[derive(Default)]
struct ScreenLog {
    toasts: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    alerts: Mutex<Vec<AlertDismissal>>,
    detail_visible: Mutex<bool>,
    focused: Mutex<Option<EntityHandle>>,
}

struct Screen {
    collection: Arc<MemoryCollection>,
    log: ScreenLog,
}

impl ListView for Screen {
    fn selected_handle(&self) -> Option<EntityHandle> {
        *self.log.focused.lock().unwrap()
    }

    fn rendered_handles(&self) -> Vec<EntityHandle> {
        self.collection
            .visible()
            .into_iter()
            .map(|(handle, _)| handle)
            .collect()
    }

    fn focus_and_select(&self, handle: EntityHandle) {
        *self.log.focused.lock().unwrap() = Some(handle);
    }

    fn set_search_width(&self, _width_percent: u8) {}
}

impl DetailView for Screen {
    fn bind(&self, _handle: Option<EntityHandle>) {}

    fn set_detail_visible(&self, visible: bool) {
        *self.log.detail_visible.lock().unwrap() = visible;
    }

    fn resize_detail_pane(&self, _width_percent: u8, _resizable: bool) {}
}

impl Notifier for Screen {
    fn toast(&self, text: &str) {
        self.log.toasts.lock().unwrap().push(text.to_string());
    }

    fn blocking_error(&self, text: &str, on_close: Option<AlertDismissal>) {
        self.log.errors.lock().unwrap().push(text.to_string());
        if let Some(on_close) = on_close {
            self.log.alerts.lock().unwrap().push(on_close);
        }
    }
}

struct Fixture {
    collection: Arc<MemoryCollection>,
    channel: Arc<MemoryMessageChannel>,
    screen: Arc<Screen>,
    session: EditSessionController,
    selection: SelectionController,
    sort_filter: SortFilterController,
}

fn fixture() -> Fixture {
    let settings = SessionSettings::default();
    let channel = Arc::new(MemoryMessageChannel::new());
    let collection = Arc::new(MemoryCollection::sample().with_message_channel(channel.clone()));
    let screen = Arc::new(Screen {
        collection: collection.clone(),
        log: ScreenLog::default(),
    });
    let collaborators = Collaborators {
        collection: collection.clone(),
        messages: channel.clone(),
        list: screen.clone(),
        detail: screen.clone(),
        notifier: screen.clone(),
        texts: Arc::new(DefaultTexts),
    };
    Fixture {
        session: EditSessionController::new(&collaborators, &settings),
        selection: SelectionController::new(&collaborators, settings.layout),
        sort_filter: SortFilterController::new(collaborators.collection.clone(), &settings),
        collection,
        channel,
        screen,
    }
}

#[tokio::test]
async fn create_edit_sort_and_save() {
    let mut fx = fixture();

    let handle = fx.session.create();
    assert_eq!(fx.screen.selected_handle(), Some(handle));

    fx.collection
        .set_field(handle, PersonField::UserName, "zedperson")
        .expect("user name");
    fx.session.input_changed(false, true);
    fx.collection
        .set_field(handle, PersonField::LastName, "Zed")
        .expect("last name");
    fx.session.input_changed(false, false);

    fx.sort_filter.toggle_sort();
    let order = fx.sort_filter.toggle_sort();
    fx.session.record_sort_order(order);
    assert_eq!(order, SortOrder::Descending);

    fx.session.save().await.expect("save");

    let state = fx.session.view_state();
    assert!(!state.has_unsaved_changes);
    assert!(!state.busy);
    assert!(!state.username_field_empty);
    assert_eq!(state.sort_order_index, 2);
    assert_eq!(
        fx.collection.active_sorter(),
        Some(Sorter {
            field: PersonField::LastName,
            descending: true,
        })
    );
    assert_eq!(fx.collection.visible()[0].1.last_name, "Zed");
    assert_eq!(
        *fx.screen.log.toasts.lock().unwrap(),
        vec!["Changes sent".to_string()]
    );
}

#[tokio::test]
async fn rejected_batch_escalates_to_technical_error_until_reset() {
    let mut fx = fixture();
    fx.session.create();

    assert!(fx.session.save().await.is_err());
    assert!(!fx.session.has_technical_error());

    assert_eq!(fx.session.pump_technical_messages(), 1);
    assert!(fx.session.has_technical_error());
    assert!(fx.session.is_alert_open());
    assert!(fx.channel.unacknowledged().is_empty());

    fx.session.reset_changes();
    assert!(!fx.session.view_state().has_unsaved_changes);
    assert!(!fx.collection.has_pending_changes());

    for alert in fx.screen.log.alerts.lock().unwrap().drain(..) {
        alert.dismiss();
    }
    assert!(!fx.session.is_alert_open());
}

#[tokio::test]
async fn deleting_the_pinned_row_collapses_the_detail_pane() {
    let mut fx = fixture();
    let (handle, _) = fx.collection.visible()[2].clone();

    fx.selection.select(handle).expect("select");
    assert!(*fx.screen.log.detail_visible.lock().unwrap());

    fx.session.delete(Some(handle)).await.expect("delete");

    assert!(!*fx.screen.log.detail_visible.lock().unwrap());
    assert_eq!(fx.selection.pinned(), None);
    assert!(!fx.collection.is_kept_alive(handle));
}

#[tokio::test]
async fn refresh_is_refused_while_edits_are_pending() {
    let mut fx = fixture();
    fx.session.create();

    assert!(fx.session.refresh().await.is_err());
    assert_eq!(fx.collection.refresh_count(), 0);

    fx.session.reset_changes();
    fx.session.refresh().await.expect("refresh");
    assert_eq!(fx.collection.refresh_count(), 1);
}

#[tokio::test]
async fn search_then_delete_through_a_named_group_is_deferred() {
    let fx = fixture();
    fx.sort_filter.search("ket");
    let visible = fx.collection.visible();
    assert_eq!(visible.len(), 1);

    fx.collection
        .delete(visible[0].0, UpdateGroup::Named("peopleGroup".into()))
        .await
        .expect("deferred delete");
    assert!(fx.collection.visible().is_empty());
    assert!(fx.collection.has_pending_changes());
}
