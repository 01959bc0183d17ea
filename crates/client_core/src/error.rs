use shared::error::CollectionError;
use thiserror::Error;

/// Outcome of a controller operation. Collection failures and rejected
/// refreshes have already been shown to the user by the time they are
/// returned; `SaveInFlight` is a caller error and is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("refresh rejected: the list has unsaved changes")]
    PendingChanges,
    #[error("a save is already in flight")]
    SaveInFlight,
    #[error(transparent)]
    Collection(#[from] CollectionError),
}
