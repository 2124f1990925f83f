use std::cell::Cell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use githd_api::CommittedFile;
use githd_listing_api::{
    FileListing, GitQuery, ListingKind, ListingNode, ListingSink, ListingView, QueryResult,
};

use crate::state::ListingState;
use crate::tree::build_tree;

/// Tree listing shown in the explorer panel.
pub struct ExplorerListing {
    state: ListingState,
    with_folder: Cell<bool>,
}

impl ExplorerListing {
    /// Create an empty listing publishing to `sink`.
    #[must_use]
    pub fn new(git: Rc<dyn GitQuery>, sink: Rc<dyn ListingSink>, with_folder: bool) -> Self {
        Self {
            state: ListingState::new(git, sink),
            with_folder: Cell::new(with_folder),
        }
    }

    /// Whether files are currently grouped by folder.
    #[must_use]
    pub fn with_folder(&self) -> bool {
        self.with_folder.get()
    }

    fn nodes(&self, files: &[CommittedFile]) -> Vec<ListingNode> {
        if self.with_folder.get() {
            build_tree(files)
        } else {
            files
                .iter()
                .cloned()
                .map(|file| ListingNode::File { file })
                .collect()
        }
    }
}

impl FileListing for ExplorerListing {
    fn kind(&self) -> ListingKind {
        ListingKind::Explorer
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
            Some(reference) => ListingView::Tree {
                reference,
                nodes: self.nodes(&self.state.files()),
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

    fn supports_folder_grouping(&self) -> bool {
        true
    }

    fn set_with_folder(&self, with_folder: bool) {
        if self.with_folder.replace(with_folder) != with_folder {
            tracing::debug!(with_folder, "regrouping explorer listing");
            self.state.publish(&self.view());
        }
    }
}
