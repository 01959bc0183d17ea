//! Edit session: dirty tracking, batch save/reset, and escalation of
//! technical service messages into a sticky dirty state.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{EntityHandle, Person, SortOrder},
    error::CollectionError,
    protocol::{MessageFilter, ServiceMessage, UpdateGroup},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    collaborators::{
        AlertDismissal, Collaborators, EntityCollection, ListView, MessageChannel,
        MessageSubscription, Notifier,
    },
    config::SessionSettings,
    error::SessionError,
    texts::{TextCatalog, TextKey},
    view_state::{DirtyState, SessionPhase, ViewModel, ViewState},
};

/// Latch guarding the single blocking technical-error alert.
#[derive(Debug, Default)]
struct AlertLatch {
    open: Arc<AtomicBool>,
}

impl AlertLatch {
    fn try_open(&self) -> Option<AlertDismissal> {
        self.open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| AlertDismissal::new(Arc::clone(&self.open)))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Holds the session in [`SessionPhase::Saving`] with `busy` set. Dropping it
/// returns to idle, including when the save future itself is dropped.
struct SaveFlight<'a> {
    phase: &'a mut SessionPhase,
    view: &'a ViewModel,
}

impl<'a> SaveFlight<'a> {
    fn begin(phase: &'a mut SessionPhase, view: &'a ViewModel) -> Self {
        *phase = SessionPhase::Saving;
        view.update(|state| state.busy = true);
        Self { phase, view }
    }
}

impl Drop for SaveFlight<'_> {
    fn drop(&mut self) {
        *self.phase = SessionPhase::Idle;
        self.view.update(|state| state.busy = false);
    }
}

pub struct EditSessionController {
    collection: Arc<dyn EntityCollection>,
    messages: Arc<dyn MessageChannel>,
    list: Arc<dyn ListView>,
    notifier: Arc<dyn Notifier>,
    texts: Arc<dyn TextCatalog>,
    batch_group: String,
    default_age: u32,
    view: ViewModel,
    dirty: DirtyState,
    phase: SessionPhase,
    alert: AlertLatch,
    subscription: MessageSubscription,
}

impl EditSessionController {
    /// Subscribes to technical messages; the subscription lives as long as
    /// the controller.
    pub fn new(collaborators: &Collaborators, settings: &SessionSettings) -> Self {
        let subscription = collaborators.messages.subscribe(MessageFilter::technical());
        debug!(subscription = %subscription.id(), "edit session subscribed to technical messages");
        Self {
            collection: Arc::clone(&collaborators.collection),
            messages: Arc::clone(&collaborators.messages),
            list: Arc::clone(&collaborators.list),
            notifier: Arc::clone(&collaborators.notifier),
            texts: Arc::clone(&collaborators.texts),
            batch_group: settings.batch_group.clone(),
            default_age: settings.default_age,
            view: ViewModel::new(),
            dirty: DirtyState::Clean,
            phase: SessionPhase::Idle,
            alert: AlertLatch::default(),
            subscription,
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.view.snapshot()
    }

    pub fn subscribe_view_state(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub fn has_technical_error(&self) -> bool {
        self.dirty == DirtyState::TechnicalError
    }

    pub fn is_alert_open(&self) -> bool {
        self.alert.is_open()
    }

    /// Appends a blank row, marks the session dirty and focuses the new row
    /// if the list renders it.
    pub fn create(&mut self) -> EntityHandle {
        let handle = self.collection.create(Person::blank(self.default_age));
        self.set_dirty(Some(true));
        self.view.update(|state| state.username_field_empty = true);

        if self.list.rendered_handles().contains(&handle) {
            self.list.focus_and_select(handle);
        } else {
            debug!(%handle, "created row is not rendered; focus skipped");
        }
        info!(%handle, "created entity");
        handle
    }

    pub async fn delete(&mut self, handle: Option<EntityHandle>) -> Result<(), SessionError> {
        let Some(handle) = handle else {
            return Ok(());
        };

        match self.collection.delete(handle, UpdateGroup::Auto).await {
            Ok(()) => {
                info!(%handle, "deleted entity");
                self.notifier
                    .toast(&self.texts.text(TextKey::DeletionSuccess, &[]));
                Ok(())
            }
            Err(err) => Err(self.report_failure("delete", err)),
        }
    }

    pub fn input_changed(&mut self, escaped: bool, username_non_empty: bool) {
        if escaped {
            self.set_dirty(None);
            return;
        }
        self.set_dirty(Some(true));
        if username_non_empty {
            self.view.update(|state| state.username_field_empty = false);
        }
    }

    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        if self.collection.has_pending_changes() {
            warn!("refresh rejected while changes are pending");
            self.notifier
                .blocking_error(&self.texts.text(TextKey::RefreshNotPossible, &[]), None);
            return Err(SessionError::PendingChanges);
        }

        match self.collection.refresh().await {
            Ok(()) => {
                self.notifier
                    .toast(&self.texts.text(TextKey::RefreshSuccess, &[]));
                Ok(())
            }
            Err(err) => Err(self.report_failure("refresh", err)),
        }
    }

    pub fn reset_changes(&mut self) {
        self.collection.reset_changes();
        self.dirty = DirtyState::Clean;
        self.set_dirty(None);
        info!("pending changes discarded");
    }

    pub async fn reset_data_source(&mut self) -> Result<(), SessionError> {
        if let Err(err) = self.collection.reset_data_source().await {
            return Err(self.report_failure("reset data source", err));
        }
        if let Err(err) = self.collection.refresh().await {
            return Err(self.report_failure("refresh after data source reset", err));
        }
        self.set_dirty(None);
        self.notifier
            .toast(&self.texts.text(TextKey::SourceResetSuccess, &[]));
        Ok(())
    }

    /// Submits the batch group. `busy` stays set for the whole flight and is
    /// cleared on both outcomes.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Saving {
            warn!("save requested while a previous save is still in flight");
            return Err(SessionError::SaveInFlight);
        }

        // A new save attempt supersedes earlier technical errors.
        if self.dirty == DirtyState::TechnicalError {
            self.dirty = DirtyState::Dirty;
        }
        info!(group = %self.batch_group, "submitting batch");

        let flight = SaveFlight::begin(&mut self.phase, &self.view);
        let outcome = self.collection.submit_batch(&self.batch_group).await;
        drop(flight);

        match outcome {
            Ok(()) => {
                self.notifier
                    .toast(&self.texts.text(TextKey::ChangesSent, &[]));
                self.set_dirty(Some(false));
                info!(group = %self.batch_group, "batch submitted");
                Ok(())
            }
            Err(err) => {
                self.set_dirty(Some(true));
                Err(self.report_failure("save", err))
            }
        }
    }

    /// Escalates a batch of technical messages. Messages are acknowledged on
    /// the channel every time; only one alert is shown while the latch is
    /// open, and later batches are not displayed.
    pub fn on_technical_message(&mut self, messages: Vec<ServiceMessage>) {
        let Some(first) = messages.first() else {
            return;
        };

        if let Err(err) = self.messages.remove(&messages) {
            warn!(error = %err, count = messages.len(), "failed to acknowledge technical messages");
        }

        self.dirty = DirtyState::TechnicalError;
        self.set_dirty(Some(true));

        match self.alert.try_open() {
            Some(dismissal) => {
                warn!(message = %first.message, count = messages.len(), "technical error reported");
                self.notifier.blocking_error(&first.message, Some(dismissal));
            }
            None => {
                debug!(
                    message = %first.message,
                    count = messages.len(),
                    "technical alert already open; batch not displayed"
                );
            }
        }
    }

    /// Handles every technical batch already queued on the subscription.
    pub fn pump_technical_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Some(batch) = self.subscription.try_recv() {
            self.on_technical_message(batch);
            handled += 1;
        }
        handled
    }

    /// Waits for the next technical batch and handles it. Returns `false`
    /// once the channel has shut down.
    pub async fn process_next_technical_batch(&mut self) -> bool {
        match self.subscription.recv().await {
            Some(batch) => {
                self.on_technical_message(batch);
                true
            }
            None => false,
        }
    }

    pub fn record_sort_order(&mut self, order: SortOrder) {
        self.view
            .update(|state| state.sort_order_index = order.index());
    }

    /// `Some` forces the flag, `None` asks the collection. A technical error
    /// overrides both.
    fn set_dirty(&mut self, requested: Option<bool>) {
        if self.dirty != DirtyState::TechnicalError {
            let dirty = requested.unwrap_or_else(|| self.collection.has_pending_changes());
            self.dirty = DirtyState::from_flag(dirty);
        }
        let has_unsaved_changes = self.dirty.reads_dirty();
        self.view
            .update(|state| state.has_unsaved_changes = has_unsaved_changes);
    }

    fn report_failure(&self, operation: &str, err: CollectionError) -> SessionError {
        warn!(operation, code = ?err.code, error = %err.message, "collection operation failed");
        self.notifier.blocking_error(err.message(), None);
        SessionError::Collection(err)
    }
}

#[cfg(test)]
#[path = "tests/edit_session_tests.rs"]
mod tests;
