use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use githd_api::CommittedFile;
use githd_listing_api::{FileListing, GitQuery, ListingKind, ListingSink, ListingView, QueryResult};

use crate::state::ListingState;

/// Flat listing shown in the source-control panel.
pub struct ScmListing {
    state: ListingState,
}

impl ScmListing {
    /// Create an empty listing publishing to `sink`.
    #[must_use]
    pub fn new(git: Rc<dyn GitQuery>, sink: Rc<dyn ListingSink>) -> Self {
        Self {
            state: ListingState::new(git, sink),
        }
    }
}

impl FileListing for ScmListing {
    fn kind(&self) -> ListingKind {
        ListingKind::Scm
    }

    fn update<'a>(&'a self, reference: &'a str) -> LocalBoxFuture<'a, QueryResult<()>> {
        async move {
            if self.state.load(reference).await? {
                self.state.publish(&self.view());
            }
            Ok(())
        }
        .boxed_local()
    }

    fn clear(&self) {
        self.state.reset();
        self.state.publish(&ListingView::Empty);
    }

    fn current_ref(&self) -> Option<String> {
        self.state.reference()
    }

    fn files(&self) -> Vec<CommittedFile> {
        self.state.files()
    }

    fn view(&self) -> ListingView {
        match self.state.reference() {
            Some(reference) => ListingView::Flat {
                reference,
                files: self.state.files(),
            },
            None => ListingView::Empty,
        }
    }

    fn dispose(&self) {
        self.state.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}
