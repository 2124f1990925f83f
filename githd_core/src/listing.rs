use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use githd_listing_api::FileListing;

/// Shared, swappable reference to the active committed-file listing.
///
/// Clones share the same slot, so every holder observes a rebind at once.
/// Consumers only read it through [`ListingHandle::current`]; the
/// configuration reconciler is the only writer.
#[derive(Clone)]
pub struct ListingHandle {
    slot: Rc<RefCell<Rc<dyn FileListing>>>,
}

impl ListingHandle {
    /// Wrap the initial listing.
    #[must_use]
    pub fn new(listing: Rc<dyn FileListing>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(listing)),
        }
    }

    /// The listing commands should act on right now.
    #[must_use]
    pub fn current(&self) -> Rc<dyn FileListing> {
        Rc::clone(&self.slot.borrow())
    }

    /// Replace the active listing, returning the previous one.
    pub(crate) fn rebind(&self, listing: Rc<dyn FileListing>) -> Rc<dyn FileListing> {
        self.slot.replace(listing)
    }
}

impl fmt::Debug for ListingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current();
        f.debug_struct("ListingHandle")
            .field("kind", &current.kind())
            .field("reference", &current.current_ref())
            .finish()
    }
}
