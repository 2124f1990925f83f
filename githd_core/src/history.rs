//! The history document: a paged list of commits for one branch.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::Rc;

use githd_listing_api::GitQuery;

use crate::{listing::ListingHandle, LogEntry, Result};

type ChangeListener = Rc<dyn Fn(&str)>;

/// Coordinator of the history document and its pagination state.
///
/// Fetches run as local tasks, so [`HistoryView::update`] and
/// [`HistoryView::load_more`] must be called from inside a
/// [`tokio::task::LocalSet`].
pub struct HistoryView {
    git: Rc<dyn GitQuery>,
    listing: ListingHandle,
    branch: RefCell<Option<String>>,
    commits_count: Cell<u32>,
    entries: RefCell<Vec<LogEntry>>,
    loading: Cell<bool>,
    loading_more: Cell<bool>,
    exhausted: Cell<bool>,
    generation: Cell<u64>,
    listeners: RefCell<Vec<ChangeListener>>,
}

#[derive(Clone, Copy)]
enum Fetch {
    OnePage,
    UntilExhausted,
}

impl HistoryView {
    /// Identifier of the history document.
    pub const DEFAULT_URI: &'static str = "githd://log/Git History";

    /// Create an empty view showing `HEAD`.
    #[must_use]
    pub fn new(git: Rc<dyn GitQuery>, listing: ListingHandle, commits_count: u32) -> Rc<Self> {
        Rc::new(Self {
            git,
            listing,
            branch: RefCell::new(None),
            commits_count: Cell::new(commits_count),
            entries: RefCell::new(Vec::new()),
            loading: Cell::new(false),
            loading_more: Cell::new(false),
            exhausted: Cell::new(false),
            generation: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Rebuild the document from the first page.
    ///
    /// With `show_all` the view keeps fetching pages in the background until
    /// the history is exhausted, and [`HistoryView::loading_more`] stays true
    /// until then.
    pub fn update(self: &Rc<Self>, show_all: bool) {
        let generation = self.bump();
        self.entries.borrow_mut().clear();
        self.exhausted.set(false);
        self.loading.set(true);
        self.loading_more.set(show_all);
        self.notify();

        let mode = if show_all {
            Fetch::UntilExhausted
        } else {
            Fetch::OnePage
        };
        self.spawn_fetch(generation, mode);
    }

    /// Append the next page, unless one is already loading or the history
    /// is exhausted.
    pub fn load_more(self: &Rc<Self>) {
        if self.loading.get() || self.exhausted.get() {
            return;
        }
        self.loading.set(true);
        self.loading_more.set(true);
        self.notify();
        self.spawn_fetch(self.generation.get(), Fetch::OnePage);
    }

    /// List the files of the commit at `index` in the active listing.
    ///
    /// Returns `false` when there is no such commit.
    ///
    /// # Errors
    ///
    /// Propagates the listing's query failure.
    pub async fn show_committed_files(&self, index: usize) -> Result<bool> {
        let Some(sha) = self.entries.borrow().get(index).map(|entry| entry.sha.clone()) else {
            return Ok(false);
        };
        let listing = self.listing.current();
        listing.update(&sha).await?;
        Ok(true)
    }

    /// Whether a background fetch for more history is outstanding.
    #[must_use]
    pub fn loading_more(&self) -> bool {
        self.loading_more.get()
    }

    /// Whether any fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Whether the last page has been fetched.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.get()
    }

    /// Branch whose history is shown; `None` means `HEAD`.
    #[must_use]
    pub fn branch(&self) -> Option<String> {
        self.branch.borrow().clone()
    }

    /// Show the history of `branch` on the next update.
    pub fn set_branch(&self, branch: Option<String>) {
        *self.branch.borrow_mut() = branch;
    }

    /// Page size.
    #[must_use]
    pub fn commits_count(&self) -> u32 {
        self.commits_count.get()
    }

    /// Change the page size used by later fetches.
    pub fn set_commits_count(&self, commits_count: u32) {
        self.commits_count.set(commits_count);
    }

    /// Commits fetched so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Text of the history document.
    #[must_use]
    pub fn content(&self) -> String {
        let entries = self.entries.borrow();
        let mut out = String::new();
        let branch = self.branch.borrow();
        let _ = writeln!(out, "Git History ({})", branch.as_deref().unwrap_or("HEAD"));
        let _ = writeln!(out);

        for entry in entries.iter() {
            let _ = write!(out, "{}  {}  {}", entry.short_sha(), entry.subject, entry.author);
            if let Some(email) = &entry.email {
                let _ = write!(out, " <{email}>");
            }
            out.push('\n');
        }

        if self.loading.get() {
            let _ = writeln!(out, "\nLoading...");
        } else if entries.is_empty() {
            let _ = writeln!(out, "No commits.");
        } else if !self.exhausted.get() {
            let _ = writeln!(out, "\n...More");
        }
        out
    }

    /// Call `listener` with the new document text after every change.
    pub fn on_did_change(&self, listener: impl Fn(&str) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Drop every change listener.
    pub fn clear_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    fn spawn_fetch(self: &Rc<Self>, generation: u64, mode: Fetch) {
        let view = Rc::clone(self);
        tokio::task::spawn_local(async move {
            if let Err(err) = view.fetch(generation, mode).await {
                tracing::warn!(error = %err, "failed to load history");
                if view.generation.get() == generation {
                    view.finish_loading();
                }
            }
        });
    }

    async fn fetch(&self, generation: u64, mode: Fetch) -> Result<()> {
        loop {
            let branch = self.branch();
            let skip = self.entries.borrow().len();
            let count = usize::try_from(self.commits_count.get().max(1)).unwrap_or(usize::MAX);

            let page = self.git.log(branch.as_deref(), skip, count).await?;
            if self.generation.get() != generation {
                tracing::debug!("dropping superseded history page");
                return Ok(());
            }

            let exhausted = page.len() < count;
            self.entries.borrow_mut().extend(page);
            self.exhausted.set(exhausted);

            if exhausted || matches!(mode, Fetch::OnePage) {
                break;
            }
            self.notify();
        }

        tracing::debug!(entries = self.entries.borrow().len(), "history loaded");
        self.finish_loading();
        Ok(())
    }

    fn finish_loading(&self) {
        self.loading.set(false);
        self.loading_more.set(false);
        self.notify();
    }

    fn bump(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    fn notify(&self) {
        let listeners: Vec<ChangeListener> = self.listeners.borrow().iter().cloned().collect();
        if listeners.is_empty() {
            return;
        }
        let content = self.content();
        for listener in listeners {
            listener(&content);
        }
    }
}

impl std::fmt::Debug for HistoryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryView")
            .field("branch", &self.branch.borrow())
            .field("commits_count", &self.commits_count.get())
            .field("entries", &self.entries.borrow().len())
            .field("loading_more", &self.loading_more.get())
            .finish_non_exhaustive()
    }
}
