use std::cell::{Cell, RefCell};
use std::rc::Rc;

use githd_api::CommittedFile;
use githd_listing_api::{GitQuery, ListingSink, ListingView, QueryResult};

/// State shared by both listing kinds: the displayed ref and its files.
pub(crate) struct ListingState {
    git: Rc<dyn GitQuery>,
    sink: Rc<dyn ListingSink>,
    reference: RefCell<Option<String>>,
    files: RefCell<Vec<CommittedFile>>,
    generation: Cell<u64>,
    disposed: Cell<bool>,
}

impl ListingState {
    pub(crate) fn new(git: Rc<dyn GitQuery>, sink: Rc<dyn ListingSink>) -> Self {
        Self {
            git,
            sink,
            reference: RefCell::new(None),
            files: RefCell::new(Vec::new()),
            generation: Cell::new(0),
            disposed: Cell::new(false),
        }
    }

    /// Fetch and store the files for `reference`.
    ///
    /// Returns `false` when the result was dropped because the listing was
    /// disposed or a newer request superseded this one.
    pub(crate) async fn load(&self, reference: &str) -> QueryResult<bool> {
        if self.disposed.get() {
            return Ok(false);
        }
        if reference.trim().is_empty() {
            self.reset();
            return Ok(true);
        }

        let generation = self.bump();
        let files = self.git.committed_files(reference).await?;

        if self.disposed.get() || generation != self.generation.get() {
            tracing::debug!(reference, "dropping superseded listing update");
            return Ok(false);
        }

        *self.reference.borrow_mut() = Some(reference.to_owned());
        *self.files.borrow_mut() = files;
        Ok(true)
    }

    /// Forget the current ref; in-flight loads no longer apply.
    pub(crate) fn reset(&self) {
        self.bump();
        self.reference.borrow_mut().take();
        self.files.borrow_mut().clear();
    }

    pub(crate) fn reference(&self) -> Option<String> {
        self.reference.borrow().clone()
    }

    pub(crate) fn files(&self) -> Vec<CommittedFile> {
        self.files.borrow().clone()
    }

    pub(crate) fn publish(&self, view: &ListingView) {
        if !self.disposed.get() {
            self.sink.listing_changed(view);
        }
    }

    pub(crate) fn dispose(&self) {
        self.disposed.set(true);
        self.bump();
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn bump(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }
}
