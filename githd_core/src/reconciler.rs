use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use githd_listing_api::FileListing;

use crate::{
    config::SettingsStore, history::HistoryView, host::Disposable, listing::ListingHandle,
    ListingKind, ViewPreferences,
};

/// Builds a listing for a presentation kind and folder-grouping flag.
pub type ListingFactory = Rc<dyn Fn(ListingKind, bool) -> Rc<dyn FileListing>>;

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// The listing was replaced by one of the other kind.
    pub swapped: bool,
    /// Folder grouping was toggled on the existing listing.
    pub regrouped: bool,
}

/// Applies preference changes to the live listing and history view.
///
/// A `use_explorer` change replaces the listing and wins over a simultaneous
/// `with_folder` change, which the new listing picks up at construction.
pub struct ConfigReconciler {
    settings: Rc<SettingsStore>,
    listing: ListingHandle,
    history: Rc<HistoryView>,
    factory: ListingFactory,
    snapshot: Cell<ViewPreferences>,
    replaced: RefCell<Vec<Rc<dyn FileListing>>>,
}

impl ConfigReconciler {
    /// Start from `snapshot`, the preferences the current listing was built with.
    #[must_use]
    pub fn new(
        settings: Rc<SettingsStore>,
        listing: ListingHandle,
        history: Rc<HistoryView>,
        factory: ListingFactory,
        snapshot: ViewPreferences,
    ) -> Self {
        Self {
            settings,
            listing,
            history,
            factory,
            snapshot: Cell::new(snapshot),
            replaced: RefCell::new(Vec::new()),
        }
    }

    /// Preferences last applied.
    #[must_use]
    pub fn snapshot(&self) -> ViewPreferences {
        self.snapshot.get()
    }

    /// Bring the listing and history view in line with the stored settings.
    ///
    /// A replacement listing is reloaded with the previous ref in a local
    /// task, so this must run inside a [`tokio::task::LocalSet`] when a swap
    /// can happen.
    pub fn reconcile(&self) -> Reconciliation {
        let previous = self.snapshot.get();
        let next = self.settings.preferences();
        let mut outcome = Reconciliation::default();

        if next.use_explorer != previous.use_explorer {
            self.swap(next);
            outcome.swapped = true;
        } else if next.with_folder != previous.with_folder {
            let listing = self.listing.current();
            if listing.supports_folder_grouping() {
                listing.set_with_folder(next.with_folder);
                outcome.regrouped = true;
            }
        }

        self.history.set_commits_count(next.commits_count);
        self.snapshot.set(next);

        tracing::debug!(
            swapped = outcome.swapped,
            regrouped = outcome.regrouped,
            commits_count = next.commits_count,
            "reconciled preferences"
        );
        outcome
    }

    /// Listings created by swaps that have not been released yet.
    ///
    /// The extension adds these to its subscriptions so they are disposed
    /// with it.
    pub fn take_replaced(&self) -> Vec<Rc<dyn FileListing>> {
        std::mem::take(&mut *self.replaced.borrow_mut())
    }

    fn swap(&self, next: ViewPreferences) {
        let old = self.listing.current();
        let reference = old.current_ref();
        old.dispose();

        let kind = ListingKind::from_use_explorer(next.use_explorer);
        let fresh = (self.factory)(kind, next.with_folder);
        self.listing.rebind(Rc::clone(&fresh));
        self.replaced.borrow_mut().push(Rc::clone(&fresh));
        tracing::info!(kind = kind.label(), reference = ?reference, "switched committed files view");

        if let Some(reference) = reference {
            tokio::task::spawn_local(async move {
                if let Err(err) = fresh.update(&reference).await {
                    tracing::warn!(%reference, error = %err, "failed to restore listing");
                }
            });
        }
    }
}

impl Disposable for ConfigReconciler {
    fn dispose(&self) {
        for listing in self.take_replaced() {
            listing.dispose();
        }
    }
}

impl fmt::Debug for ConfigReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigReconciler")
            .field("snapshot", &self.snapshot.get())
            .field("listing", &self.listing)
            .finish_non_exhaustive()
    }
}
