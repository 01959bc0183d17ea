//! Controllers for a people list with a master/detail editor over a
//! batch-oriented remote collection.
//!
//! All writes go into one deferred batch that is either submitted or
//! discarded. [`EditSessionController`] owns the dirty/busy state exposed to
//! the UI, [`SelectionController`] pins the row shown in the detail pane and
//! [`SortFilterController`] drives sorting and search.

pub mod collaborators;
pub mod config;
pub mod edit_session;
pub mod error;
pub mod memory;
pub mod selection;
pub mod sort_filter;
pub mod texts;
pub mod view_state;

pub use collaborators::{
    AlertDismissal, Collaborators, DetachCallback, DetailView, EntityCollection, ListView,
    MessageChannel, MessageSubscription, Notifier,
};
pub use config::{load_settings, LayoutSettings, SessionSettings};
pub use edit_session::EditSessionController;
pub use error::SessionError;
pub use memory::{FailPoint, MemoryCollection, MemoryMessageChannel};
pub use selection::SelectionController;
pub use sort_filter::SortFilterController;
pub use texts::{DefaultTexts, TextCatalog, TextKey};
pub use view_state::{DirtyState, ViewModel, ViewState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
