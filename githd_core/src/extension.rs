use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use githd_listing_api::{FileListing, GitQuery, ListingSink};
use githd_listings::create_file_listing;

use crate::{
    commands::{CommandCenter, CommandContext, CommandRegistry},
    config::SettingsStore,
    history::HistoryView,
    host::{Disposable, Host},
    listing::ListingHandle,
    reconciler::{ConfigReconciler, ListingFactory},
    ListingKind, Result,
};

type Subscriptions = Rc<RefCell<Vec<Rc<dyn Disposable>>>>;

/// The activated command surface and everything it owns.
pub struct Extension {
    listing: ListingHandle,
    history: Rc<HistoryView>,
    reconciler: Rc<ConfigReconciler>,
    subscriptions: Subscriptions,
}

impl Extension {
    /// Wire the listing, history view, commands and reconciler together and
    /// register every command with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CommandAlreadyRegistered`] when `registry`
    /// still holds the commands of another activation.
    pub fn activate(
        host: Rc<dyn Host>,
        git: Rc<dyn GitQuery>,
        registry: &Rc<CommandRegistry>,
        settings: Rc<SettingsStore>,
        sink: Rc<dyn ListingSink>,
    ) -> Result<Self> {
        let preferences = settings.preferences();
        let factory: ListingFactory = {
            let git = Rc::clone(&git);
            Rc::new(move |kind, with_folder| {
                create_file_listing(kind, with_folder, Rc::clone(&git), Rc::clone(&sink))
            })
        };

        let initial = factory(
            ListingKind::from_use_explorer(preferences.use_explorer),
            preferences.with_folder,
        );
        let listing = ListingHandle::new(Rc::clone(&initial));
        let history = HistoryView::new(
            Rc::clone(&git),
            listing.clone(),
            preferences.commits_count,
        );

        let center = CommandCenter::new(
            registry,
            CommandContext {
                host,
                git,
                listing: listing.clone(),
                history: Rc::clone(&history),
                settings: Rc::clone(&settings),
            },
        )?;

        let reconciler = Rc::new(ConfigReconciler::new(
            Rc::clone(&settings),
            listing.clone(),
            Rc::clone(&history),
            factory,
            preferences,
        ));

        let subscriptions: Subscriptions = Rc::new(RefCell::new(vec![
            Rc::new(center) as Rc<dyn Disposable>,
            Rc::new(ListingSubscription(initial)),
        ]));
        let settings_subscription = settings.subscribe(on_settings_changed(
            Rc::downgrade(&reconciler),
            Rc::downgrade(&subscriptions),
        ));
        subscriptions.borrow_mut().extend([
            Rc::new(settings_subscription) as Rc<dyn Disposable>,
            Rc::clone(&reconciler) as Rc<dyn Disposable>,
        ]);

        tracing::info!(
            use_explorer = preferences.use_explorer,
            with_folder = preferences.with_folder,
            commits_count = preferences.commits_count,
            "githd activated"
        );
        Ok(Self {
            listing,
            history,
            reconciler,
            subscriptions,
        })
    }

    /// Handle to the active committed-files listing.
    #[must_use]
    pub fn listing(&self) -> &ListingHandle {
        &self.listing
    }

    /// The history document coordinator.
    #[must_use]
    pub fn history(&self) -> &Rc<HistoryView> {
        &self.history
    }

    /// The preference reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Rc<ConfigReconciler> {
        &self.reconciler
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

fn on_settings_changed(
    reconciler: Weak<ConfigReconciler>,
    subscriptions: Weak<RefCell<Vec<Rc<dyn Disposable>>>>,
) -> impl Fn() + 'static {
    move || {
        let (Some(reconciler), Some(subscriptions)) = (reconciler.upgrade(), subscriptions.upgrade())
        else {
            return;
        };
        reconciler.reconcile();
        let replaced = reconciler.take_replaced();
        subscriptions.borrow_mut().extend(
            replaced
                .into_iter()
                .map(|listing| Rc::new(ListingSubscription(listing)) as Rc<dyn Disposable>),
        );
    }
}

impl Disposable for Extension {
    fn dispose(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for subscription in &subscriptions {
            subscription.dispose();
        }
        self.history.clear_listeners();
        tracing::info!(released = subscriptions.len(), "githd deactivated");
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("listing", &self.listing)
            .field("history", &self.history)
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

struct ListingSubscription(Rc<dyn FileListing>);

impl Disposable for ListingSubscription {
    fn dispose(&self) {
        self.0.dispose();
    }
}
