//! Contracts shared by the githd core, its git facade and the committed-file listings.

mod types;

use futures::future::LocalBoxFuture;
use githd_api::{CommittedFile, GitRef, LogEntry};

pub use types::{ListingKind, ListingNode, ListingView, QueryError, QueryResult};

/// Read-only git queries the views depend on.
///
/// Futures are `!Send`: every implementation is driven from the single
/// control thread.
pub trait GitQuery {
    /// List branch heads, tags and remote heads in repository order.
    ///
    /// # Errors
    ///
    /// Implementors surface repository access failures.
    fn refs(&self) -> LocalBoxFuture<'_, QueryResult<Vec<GitRef>>>;

    /// Files changed by `reference` relative to its first parent.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRef`] when `reference` does not resolve.
    fn committed_files<'a>(
        &'a self,
        reference: &'a str,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<CommittedFile>>>;

    /// One page of history starting at `branch` (or `HEAD`), newest first.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRef`] when `branch` does not resolve.
    fn log<'a>(
        &'a self,
        branch: Option<&'a str>,
        skip: usize,
        count: usize,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<LogEntry>>>;
}

/// Renderer notified whenever a listing changes.
pub trait ListingSink {
    /// Called with the complete new state of the listing.
    fn listing_changed(&self, view: &ListingView);
}

/// A strategy presenting the files committed at one ref.
pub trait FileListing {
    /// Which presentation this listing implements.
    fn kind(&self) -> ListingKind;

    /// Load the files committed at `reference`. An empty ref clears the listing.
    ///
    /// # Errors
    ///
    /// Propagates failures from the git query facade.
    fn update<'a>(&'a self, reference: &'a str) -> LocalBoxFuture<'a, QueryResult<()>>;

    /// Reset to the empty state.
    fn clear(&self);

    /// Ref currently displayed, if any.
    fn current_ref(&self) -> Option<String>;

    /// Files currently displayed.
    fn files(&self) -> Vec<CommittedFile>;

    /// Render-ready view of the current state.
    fn view(&self) -> ListingView;

    /// Detach from the sink. Pending updates resolve as no-ops afterwards.
    fn dispose(&self);

    /// Whether [`FileListing::dispose`] has been called.
    fn is_disposed(&self) -> bool;

    /// Whether [`FileListing::set_with_folder`] has any effect.
    fn supports_folder_grouping(&self) -> bool {
        false
    }

    /// Toggle folder grouping in place.
    fn set_with_folder(&self, _with_folder: bool) {}
}
