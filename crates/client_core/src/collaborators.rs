//! Contracts of the collaborators the controllers drive: the remote entity
//! collection, the service message feed, and the list/detail/notification
//! surfaces of the UI.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{EntityHandle, Person, PersonField, SubscriptionId},
    error::CollectionError,
    protocol::{FieldFilter, MessageFilter, ServiceMessage, Sorter, UpdateGroup},
};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::debug;

use crate::texts::TextCatalog;

/// Fired by the collection when a kept-alive row is destroyed. `FnOnce`
/// guarantees a callback can run at most once.
pub type DetachCallback = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait EntityCollection: Send + Sync {
    /// Replaces the application filter; `None` clears it.
    fn filter(&self, filter: Option<FieldFilter>);
    /// Replaces the sorter; `None` restores the natural order.
    fn sort(&self, sorter: Option<Sorter>);
    fn create(&self, defaults: Person) -> EntityHandle;
    fn get(&self, handle: EntityHandle) -> Option<Person>;
    fn set_field(
        &self,
        handle: EntityHandle,
        field: PersonField,
        value: &str,
    ) -> Result<(), CollectionError>;
    async fn delete(&self, handle: EntityHandle, group: UpdateGroup)
        -> Result<(), CollectionError>;
    fn has_pending_changes(&self) -> bool;
    fn reset_changes(&self);
    async fn refresh(&self) -> Result<(), CollectionError>;
    async fn submit_batch(&self, group_id: &str) -> Result<(), CollectionError>;
    async fn reset_data_source(&self) -> Result<(), CollectionError>;
    /// Keeps `handle` alive across refreshes and arms `on_destroy`, replacing
    /// any callback previously armed for the same handle without firing it.
    fn keep_alive(
        &self,
        handle: EntityHandle,
        on_destroy: DetachCallback,
    ) -> Result<(), CollectionError>;
    /// Disarms the keep-alive of `handle` without firing its callback.
    fn release(&self, handle: EntityHandle) -> Result<(), CollectionError>;
}

pub trait MessageChannel: Send + Sync {
    fn subscribe(&self, filter: MessageFilter) -> MessageSubscription;
    /// Acknowledges delivered messages so they are not redelivered.
    fn remove(&self, messages: &[ServiceMessage]) -> Result<(), CollectionError>;
}

/// Live registration on a [`MessageChannel`]. Dropping it unsubscribes.
pub struct MessageSubscription {
    id: SubscriptionId,
    receiver: UnboundedReceiver<Vec<ServiceMessage>>,
}

impl MessageSubscription {
    pub fn new(id: SubscriptionId, receiver: UnboundedReceiver<Vec<ServiceMessage>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Vec<ServiceMessage>> {
        self.receiver.recv().await
    }

    /// Returns the next queued batch without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<ServiceMessage>> {
        match self.receiver.try_recv() {
            Ok(batch) => Some(batch),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Consumes the subscription; the unsubscribe itself happens in `Drop`.
    pub fn unsubscribe(self) {}
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.receiver.close();
        debug!(subscription = %self.id, "message subscription released");
    }
}

pub trait ListView: Send + Sync {
    fn selected_handle(&self) -> Option<EntityHandle>;
    /// Handles of the rows currently rendered, in display order.
    fn rendered_handles(&self) -> Vec<EntityHandle>;
    fn focus_and_select(&self, handle: EntityHandle);
    fn set_search_width(&self, width_percent: u8);
}

pub trait DetailView: Send + Sync {
    fn bind(&self, handle: Option<EntityHandle>);
    fn set_detail_visible(&self, visible: bool);
    fn resize_detail_pane(&self, width_percent: u8, resizable: bool);
}

pub trait Notifier: Send + Sync {
    fn toast(&self, text: &str);
    /// Shows a blocking error. When `on_close` is given, the notifier must
    /// hold it until the user closes the alert and then dismiss (or drop) it.
    fn blocking_error(&self, text: &str, on_close: Option<AlertDismissal>);
}

/// Close token for a latched alert. Dismissing or dropping it reopens the
/// latch, so a notifier that never holds the token cannot wedge it shut.
#[derive(Debug)]
pub struct AlertDismissal {
    latch: Arc<AtomicBool>,
}

impl AlertDismissal {
    pub(crate) fn new(latch: Arc<AtomicBool>) -> Self {
        Self { latch }
    }

    pub fn dismiss(self) {}
}

impl Drop for AlertDismissal {
    fn drop(&mut self) {
        self.latch.store(false, Ordering::SeqCst);
    }
}

/// Everything the controllers talk to, bundled for wiring.
#[derive(Clone)]
pub struct Collaborators {
    pub collection: Arc<dyn EntityCollection>,
    pub messages: Arc<dyn MessageChannel>,
    pub list: Arc<dyn ListView>,
    pub detail: Arc<dyn DetailView>,
    pub notifier: Arc<dyn Notifier>,
    pub texts: Arc<dyn TextCatalog>,
}
