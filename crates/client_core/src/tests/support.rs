use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::{
    domain::{EntityHandle, Person, PersonField},
    error::{CollectionError, ErrorCode},
    protocol::{FieldFilter, Sorter, UpdateGroup},
};
use tokio::sync::watch;

use crate::{
    collaborators::{
        AlertDismissal, Collaborators, DetachCallback, DetailView, EntityCollection, ListView,
        Notifier,
    },
    memory::MemoryMessageChannel,
    texts::DefaultTexts,
    view_state::ViewState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionCall {
    Filter(Option<FieldFilter>),
    Sort(Option<Sorter>),
    Create(Person),
    Delete(EntityHandle, UpdateGroup),
    ResetChanges,
    Refresh,
    SubmitBatch(String),
    ResetDataSource,
    KeepAlive(EntityHandle),
    Release(EntityHandle),
}

pub struct TestCollection {
    calls: Mutex<Vec<CollectionCall>>,
    pending: Mutex<bool>,
    fail_with: Mutex<Option<String>>,
    next_handle: Mutex<u64>,
    armed: Mutex<HashMap<EntityHandle, DetachCallback>>,
    busy_probe: Mutex<Option<watch::Receiver<ViewState>>>,
    busy_during_submit: Mutex<Vec<bool>>,
    stall_submit: Mutex<bool>,
    reject_keep_alive: Mutex<bool>,
}

impl TestCollection {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            pending: Mutex::new(false),
            fail_with: Mutex::new(None),
            next_handle: Mutex::new(0),
            armed: Mutex::new(HashMap::new()),
            busy_probe: Mutex::new(None),
            busy_during_submit: Mutex::new(Vec::new()),
            stall_submit: Mutex::new(false),
            reject_keep_alive: Mutex::new(false),
        }
    }

    pub fn calls(&self) -> Vec<CollectionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_pending(&self, pending: bool) {
        *self.pending.lock().unwrap() = pending;
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    pub fn probe_busy(&self, receiver: watch::Receiver<ViewState>) {
        *self.busy_probe.lock().unwrap() = Some(receiver);
    }

    pub fn busy_during_submit(&self) -> Vec<bool> {
        self.busy_during_submit.lock().unwrap().clone()
    }

    /// The next submit never completes.
    pub fn stall_next_submit(&self) {
        *self.stall_submit.lock().unwrap() = true;
    }

    pub fn reject_keep_alive(&self) {
        *self.reject_keep_alive.lock().unwrap() = true;
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }

    /// Simulates the row being destroyed by another path.
    pub fn destroy(&self, handle: EntityHandle) -> bool {
        let callback = self.armed.lock().unwrap().remove(&handle);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    fn record(&self, call: CollectionCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(&self) -> Result<(), CollectionError> {
        match self.fail_with.lock().unwrap().clone() {
            Some(message) => Err(CollectionError::new(ErrorCode::Internal, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EntityCollection for TestCollection {
    fn filter(&self, filter: Option<FieldFilter>) {
        self.record(CollectionCall::Filter(filter));
    }

    fn sort(&self, sorter: Option<Sorter>) {
        self.record(CollectionCall::Sort(sorter));
    }

    fn create(&self, defaults: Person) -> EntityHandle {
        self.record(CollectionCall::Create(defaults));
        self.set_pending(true);
        let mut next = self.next_handle.lock().unwrap();
        *next += 1;
        EntityHandle(*next)
    }

    fn get(&self, _handle: EntityHandle) -> Option<Person> {
        None
    }

    fn set_field(
        &self,
        _handle: EntityHandle,
        _field: PersonField,
        _value: &str,
    ) -> Result<(), CollectionError> {
        self.set_pending(true);
        Ok(())
    }

    async fn delete(
        &self,
        handle: EntityHandle,
        group: UpdateGroup,
    ) -> Result<(), CollectionError> {
        self.record(CollectionCall::Delete(handle, group));
        self.outcome()
    }

    fn has_pending_changes(&self) -> bool {
        *self.pending.lock().unwrap()
    }

    fn reset_changes(&self) {
        self.record(CollectionCall::ResetChanges);
        self.set_pending(false);
    }

    async fn refresh(&self) -> Result<(), CollectionError> {
        self.record(CollectionCall::Refresh);
        self.outcome()
    }

    async fn submit_batch(&self, group_id: &str) -> Result<(), CollectionError> {
        self.record(CollectionCall::SubmitBatch(group_id.to_string()));
        let stall = std::mem::take(&mut *self.stall_submit.lock().unwrap());
        if stall {
            std::future::pending::<()>().await;
        }
        if let Some(probe) = self.busy_probe.lock().unwrap().as_ref() {
            let busy = probe.borrow().busy;
            self.busy_during_submit.lock().unwrap().push(busy);
        }
        let outcome = self.outcome();
        if outcome.is_ok() {
            self.set_pending(false);
        }
        outcome
    }

    async fn reset_data_source(&self) -> Result<(), CollectionError> {
        self.record(CollectionCall::ResetDataSource);
        self.outcome()
    }

    fn keep_alive(
        &self,
        handle: EntityHandle,
        on_destroy: DetachCallback,
    ) -> Result<(), CollectionError> {
        self.record(CollectionCall::KeepAlive(handle));
        if *self.reject_keep_alive.lock().unwrap() {
            return Err(CollectionError::not_found(format!("unknown handle {handle}")));
        }
        self.armed.lock().unwrap().insert(handle, on_destroy);
        Ok(())
    }

    fn release(&self, handle: EntityHandle) -> Result<(), CollectionError> {
        self.record(CollectionCall::Release(handle));
        self.armed
            .lock()
            .unwrap()
            .remove(&handle)
            .map(drop)
            .ok_or_else(|| CollectionError::not_found("not armed"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Toast(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    open_alerts: Mutex<Vec<AlertDismissal>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Toast(text) => Some(text),
                Notice::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Error(text) => Some(text),
                Notice::Toast(_) => None,
            })
            .collect()
    }

    pub fn open_alert_count(&self) -> usize {
        self.open_alerts.lock().unwrap().len()
    }

    /// The user closes every latched alert.
    pub fn close_alerts(&self) {
        for alert in self.open_alerts.lock().unwrap().drain(..) {
            alert.dismiss();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, text: &str) {
        self.notices.lock().unwrap().push(Notice::Toast(text.to_string()));
    }

    fn blocking_error(&self, text: &str, on_close: Option<AlertDismissal>) {
        self.notices.lock().unwrap().push(Notice::Error(text.to_string()));
        if let Some(on_close) = on_close {
            self.open_alerts.lock().unwrap().push(on_close);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Bind(Option<EntityHandle>),
    DetailVisible(bool),
    ResizeDetail(u8, bool),
    SearchWidth(u8),
    Focus(EntityHandle),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    rendered: Mutex<Vec<EntityHandle>>,
    render_all: Mutex<bool>,
}

impl RecordingView {
    /// A view that renders every handle it is asked about.
    pub fn rendering_everything() -> Self {
        let view = Self::default();
        *view.render_all.lock().unwrap() = true;
        view
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn set_rendered(&self, handles: Vec<EntityHandle>) {
        *self.render_all.lock().unwrap() = false;
        *self.rendered.lock().unwrap() = handles;
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ListView for RecordingView {
    fn selected_handle(&self) -> Option<EntityHandle> {
        self.events().iter().rev().find_map(|event| match event {
            ViewEvent::Focus(handle) => Some(*handle),
            _ => None,
        })
    }

    fn rendered_handles(&self) -> Vec<EntityHandle> {
        if *self.render_all.lock().unwrap() {
            // Handles are allocated sequentially by the fakes.
            return (1..=64).map(EntityHandle).collect();
        }
        self.rendered.lock().unwrap().clone()
    }

    fn focus_and_select(&self, handle: EntityHandle) {
        self.push(ViewEvent::Focus(handle));
    }

    fn set_search_width(&self, width_percent: u8) {
        self.push(ViewEvent::SearchWidth(width_percent));
    }
}

impl DetailView for RecordingView {
    fn bind(&self, handle: Option<EntityHandle>) {
        self.push(ViewEvent::Bind(handle));
    }

    fn set_detail_visible(&self, visible: bool) {
        self.push(ViewEvent::DetailVisible(visible));
    }

    fn resize_detail_pane(&self, width_percent: u8, resizable: bool) {
        self.push(ViewEvent::ResizeDetail(width_percent, resizable));
    }
}

pub struct Harness {
    pub collection: Arc<TestCollection>,
    pub channel: Arc<MemoryMessageChannel>,
    pub view: Arc<RecordingView>,
    pub notifier: Arc<RecordingNotifier>,
    pub collaborators: Collaborators,
}

impl Harness {
    pub fn new() -> Self {
        let collection = Arc::new(TestCollection::new());
        let channel = Arc::new(MemoryMessageChannel::new());
        let view = Arc::new(RecordingView::rendering_everything());
        let notifier = Arc::new(RecordingNotifier::default());
        let collaborators = Collaborators {
            collection: collection.clone(),
            messages: channel.clone(),
            list: view.clone(),
            detail: view.clone(),
            notifier: notifier.clone(),
            texts: Arc::new(DefaultTexts),
        };
        Self {
            collection,
            channel,
            view,
            notifier,
            collaborators,
        }
    }
}
