//! Committed-file listings: the flat SCM list and the explorer tree.

mod explorer;
mod scm;
mod state;
mod tree;

use std::rc::Rc;

use githd_listing_api::{FileListing, GitQuery, ListingKind, ListingSink};

pub use explorer::ExplorerListing;
pub use scm::ScmListing;
pub use tree::build_tree;

/// Build the listing selected by `kind`.
///
/// `with_folder` only affects [`ListingKind::Explorer`].
#[must_use]
pub fn create_file_listing(
    kind: ListingKind,
    with_folder: bool,
    git: Rc<dyn GitQuery>,
    sink: Rc<dyn ListingSink>,
) -> Rc<dyn FileListing> {
    tracing::debug!(kind = kind.label(), with_folder, "creating file listing");
    match kind {
        ListingKind::Scm => Rc::new(ScmListing::new(git, sink)),
        ListingKind::Explorer => Rc::new(ExplorerListing::new(git, sink, with_folder)),
    }
}
