//! Pinned detail context: the selected row is kept alive for the detail
//! pane, and the pane collapses if that row is destroyed elsewhere.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::domain::EntityHandle;
use tracing::{debug, info, warn};

use crate::{
    collaborators::{
        Collaborators, DetachCallback, DetailView, EntityCollection, ListView, Notifier,
    },
    config::LayoutSettings,
    error::SessionError,
};

struct PinnedContext {
    handle: EntityHandle,
    // Set by the detach callback once the row is gone.
    detached: Arc<AtomicBool>,
}

impl PinnedContext {
    fn is_live(&self) -> bool {
        !self.detached.load(Ordering::SeqCst)
    }
}

pub struct SelectionController {
    collection: Arc<dyn EntityCollection>,
    list: Arc<dyn ListView>,
    detail: Arc<dyn DetailView>,
    notifier: Arc<dyn Notifier>,
    layout: LayoutSettings,
    pinned: Option<PinnedContext>,
}

impl SelectionController {
    pub fn new(collaborators: &Collaborators, layout: LayoutSettings) -> Self {
        Self {
            collection: Arc::clone(&collaborators.collection),
            list: Arc::clone(&collaborators.list),
            detail: Arc::clone(&collaborators.detail),
            notifier: Arc::clone(&collaborators.notifier),
            layout,
            pinned: None,
        }
    }

    /// The pinned handle, unless its row has been destroyed.
    pub fn pinned(&self) -> Option<EntityHandle> {
        self.pinned
            .as_ref()
            .filter(|pinned| pinned.is_live())
            .map(|pinned| pinned.handle)
    }

    /// Pins `handle` and opens the detail pane. The previous row is released
    /// only once `handle` is kept alive; on failure the previous context and
    /// the layout stay as they were.
    pub fn select(&mut self, handle: EntityHandle) -> Result<(), SessionError> {
        let detached = Arc::new(AtomicBool::new(false));
        let on_destroy = self.detach_callback(handle, Arc::clone(&detached));
        if let Err(err) = self.collection.keep_alive(handle, on_destroy) {
            warn!(%handle, error = %err, "failed to pin detail context");
            self.notifier.blocking_error(err.message(), None);
            return Err(err.into());
        }

        let previous = self.pinned.replace(PinnedContext { handle, detached });
        if let Some(previous) = previous {
            // Re-arming the same handle already replaced its callback.
            if previous.handle != handle {
                self.release(previous);
            }
        }

        self.detail.bind(Some(handle));
        self.detail.set_detail_visible(true);
        self.detail
            .resize_detail_pane(self.layout.detail_width_percent, true);
        self.list
            .set_search_width(self.layout.search_width_expanded_percent);
        info!(%handle, "pinned detail context");
        Ok(())
    }

    /// Releases the pinned row without touching the layout.
    pub fn clear(&mut self) {
        if let Some(previous) = self.pinned.take() {
            self.release(previous);
        }
    }

    fn release(&self, previous: PinnedContext) {
        if !previous.is_live() {
            debug!(handle = %previous.handle, "previous context already detached");
            return;
        }
        if let Err(err) = self.collection.release(previous.handle) {
            warn!(handle = %previous.handle, error = %err, "failed to release pinned context");
        }
    }

    fn detach_callback(&self, handle: EntityHandle, detached: Arc<AtomicBool>) -> DetachCallback {
        let list = Arc::clone(&self.list);
        let detail = Arc::clone(&self.detail);
        let layout = self.layout;
        Box::new(move || {
            if detached.swap(true, Ordering::SeqCst) {
                return;
            }
            detail.resize_detail_pane(layout.collapsed_width_percent, false);
            detail.set_detail_visible(false);
            detail.bind(None);
            list.set_search_width(layout.search_width_collapsed_percent);
            info!(%handle, "pinned context destroyed; detail pane collapsed");
        })
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
