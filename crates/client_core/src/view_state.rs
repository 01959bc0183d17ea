use serde::Serialize;
use tokio::sync::watch;

/// UI-facing flags of the edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub busy: bool,
    pub has_unsaved_changes: bool,
    pub username_field_empty: bool,
    pub sort_order_index: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            busy: false,
            has_unsaved_changes: false,
            username_field_empty: true,
            sort_order_index: 0,
        }
    }
}

/// Dirty tracking. `TechnicalError` reads as dirty no matter what the
/// collection reports, and only an explicit save or reset leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyState {
    #[default]
    Clean,
    Dirty,
    TechnicalError,
}

impl DirtyState {
    pub fn from_flag(dirty: bool) -> Self {
        if dirty {
            Self::Dirty
        } else {
            Self::Clean
        }
    }

    pub fn reads_dirty(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SessionPhase {
    #[default]
    Idle,
    Saving,
}

/// Single-writer holder of [`ViewState`]; readers subscribe for changes.
#[derive(Debug)]
pub struct ViewModel {
    tx: watch::Sender<ViewState>,
}

impl ViewModel {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> ViewState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut ViewState)) {
        self.tx.send_if_modified(|state| {
            let before = *state;
            apply(state);
            before != *state
        });
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}
