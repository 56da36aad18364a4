use thiserror::Error;

use crate::util::UrlValidationError;

/// Input rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Title is too long (max {max} characters)")]
    TitleTooLong { max: usize },
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
}

/// Failures reported by the bookmark view model.
///
/// Every external failure (store, change feed, clipboard) is converted into
/// one of these at the view-model boundary. None of them is fatal: the list
/// the user sees is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Bad title or url; nothing was sent to the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A create or delete request failed. Not retried.
    #[error("{0}")]
    Store(String),

    /// The change feed could not be (re)established; the list is served
    /// from the last snapshot until a resubscription succeeds.
    #[error("Live sync unavailable: {0}")]
    Subscription(String),

    /// Writing to the clipboard failed.
    #[error("Copy failed: {0}")]
    Clipboard(String),
}

impl SyncError {
    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}
