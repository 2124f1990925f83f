//! The command surface: a fixed table of identifiers bound to async handlers.

mod registry;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use camino::Utf8Path;
use futures::future::{FutureExt, LocalBoxFuture};
use githd_api::{USE_EXPLORER_KEY, WITH_FOLDER_KEY};
use githd_listing_api::GitQuery;

pub use registry::{CommandCallback, CommandRegistry, Registration};

use crate::{
    config::SettingsStore,
    history::HistoryView,
    host::{CommandArg, DiffOptions, Disposable, Host, QuickPickItem},
    listing::ListingHandle,
    uri, Error, GitRef, ListingKind, RefType, Result,
};

/// Command identifiers.
pub mod ids {
    /// Show the files of the ref typed in the source-control input box.
    pub const UPDATE_SHA: &str = "githd.updateSha";
    /// Empty the committed-files listing.
    pub const CLEAR: &str = "githd.clear";
    /// Hand the source-control panel back to git.
    pub const SWITCH: &str = "githd.switch";
    /// Open the history document with one page of commits.
    pub const VIEW_HISTORY: &str = "githd.viewHistory";
    /// Open the history document and load every commit.
    pub const VIEW_ALL_HISTORY: &str = "githd.viewAllHistory";
    /// Pick the branch whose history is shown.
    pub const SELECT_BRANCH: &str = "githd.selectBranch";
    /// Prompt for a ref and list its files.
    pub const INPUT_REF: &str = "githd.inputRef";
    /// Diff one committed file against its parent version.
    pub const OPEN_COMMITTED_FILE: &str = "githd.openCommittedFile";
    /// Pick the committed-files presentation.
    pub const SELECT_COMMITTED_FILES_VIEW: &str = "githd.selectCommittedFilesView";
    /// Pick whether the explorer groups files by folder.
    pub const SET_EXPLORER_VIEW_WITH_FOLDER: &str = "githd.setExplorerViewWithFolder";

    /// Every identifier, in registration order.
    pub const ALL: [&str; 10] = [
        UPDATE_SHA,
        CLEAR,
        SWITCH,
        VIEW_HISTORY,
        VIEW_ALL_HISTORY,
        SELECT_BRANCH,
        INPUT_REF,
        OPEN_COMMITTED_FILE,
        SELECT_COMMITTED_FILES_VIEW,
        SET_EXPLORER_VIEW_WITH_FOLDER,
    ];
}

const SCM_PROVIDERS: &[&str] = &["Git"];
const SELECT_BRANCH_PLACEHOLDER: &str = "Select a ref to see its history";
const INPUT_REF_PLACEHOLDER: &str = "Input a ref (sha1) to see its committed files";
const FILES_VIEW_PLACEHOLDER: &str = "Select the committed files view";
const WITH_FOLDER_PLACEHOLDER: &str = "Set if the committed files show with folder or not";

type CommandFuture = LocalBoxFuture<'static, Result<()>>;
type CommandMethod = fn(Rc<CommandContext>, Vec<CommandArg>) -> CommandFuture;

const COMMANDS: [(&str, CommandMethod); 10] = [
    (ids::UPDATE_SHA, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.update_sha().boxed_local()
    }),
    (ids::CLEAR, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.clear().boxed_local()
    }),
    (ids::SWITCH, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.switch().boxed_local()
    }),
    (ids::VIEW_HISTORY, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.view_history(false).boxed_local()
    }),
    (ids::VIEW_ALL_HISTORY, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.view_history(true).boxed_local()
    }),
    (ids::SELECT_BRANCH, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.select_branch().boxed_local()
    }),
    (ids::INPUT_REF, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.input_ref().boxed_local()
    }),
    (ids::OPEN_COMMITTED_FILE, |cx: Rc<CommandContext>, args: Vec<CommandArg>| {
        cx.open_committed_file(args).boxed_local()
    }),
    (ids::SELECT_COMMITTED_FILES_VIEW, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.select_committed_files_view().boxed_local()
    }),
    (ids::SET_EXPLORER_VIEW_WITH_FOLDER, |cx: Rc<CommandContext>, _: Vec<CommandArg>| {
        cx.set_explorer_view_with_folder().boxed_local()
    }),
];

/// Everything the command handlers act on.
pub struct CommandContext {
    /// Environment the commands run in.
    pub host: Rc<dyn Host>,
    /// Git query facade.
    pub git: Rc<dyn GitQuery>,
    /// Active committed-files listing.
    pub listing: ListingHandle,
    /// History document coordinator.
    pub history: Rc<HistoryView>,
    /// Settings written by the view pickers.
    pub settings: Rc<SettingsStore>,
}

impl CommandContext {
    async fn update_sha(self: Rc<Self>) -> Result<()> {
        let reference = self.host.scm_input_value();
        let listing = self.listing.current();
        listing.update(&reference).await?;
        Ok(())
    }

    #[allow(clippy::unused_async)]
    async fn clear(self: Rc<Self>) -> Result<()> {
        self.listing.current().clear();
        Ok(())
    }

    async fn switch(self: Rc<Self>) -> Result<()> {
        self.host.switch_scm(SCM_PROVIDERS).await
    }

    async fn view_history(self: Rc<Self>, show_all: bool) -> Result<()> {
        self.history.update(show_all);
        self.host.show_document(HistoryView::DEFAULT_URI).await?;
        // A cursor moved while pages are still arriving lands on shifting content.
        if !self.history.loading_more() {
            self.host.cursor_top();
        }
        Ok(())
    }

    async fn select_branch(self: Rc<Self>) -> Result<()> {
        let refs = self.git.refs().await?;
        let picks = refs.iter().map(branch_pick).collect();
        let Some(item) = self
            .host
            .show_quick_pick(picks, SELECT_BRANCH_PLACEHOLDER)
            .await
        else {
            return Ok(());
        };

        tracing::info!(branch = %item.label, "showing branch history");
        self.history.set_branch(Some(item.label));
        self.view_history(false).await
    }

    async fn input_ref(self: Rc<Self>) -> Result<()> {
        let reference = self.host.show_input_box(INPUT_REF_PLACEHOLDER).await;
        let Some(reference) = reference.filter(|reference| !reference.trim().is_empty()) else {
            tracing::debug!("ref input cancelled");
            return Ok(());
        };
        let listing = self.listing.current();
        listing.update(&reference).await?;
        Ok(())
    }

    async fn open_committed_file(self: Rc<Self>, args: Vec<CommandArg>) -> Result<()> {
        let Some(CommandArg::File(file)) = args.into_iter().next() else {
            return Err(Error::MissingArgument {
                command: ids::OPEN_COMMITTED_FILE,
                expected: "committed file",
            });
        };
        let reference = self
            .listing
            .current()
            .current_ref()
            .ok_or(Error::NoActiveRef)?;

        let (left, right) = uri::commit_diff_pair(Utf8Path::new(&file.path), &reference);
        let title = format!("{reference} {}", file.relative_path);
        self.host
            .open_diff(left, right, title, DiffOptions { preview: true })
            .await
    }

    async fn select_committed_files_view(self: Rc<Self>) -> Result<()> {
        let picks = [ListingKind::Explorer, ListingKind::Scm]
            .map(|kind| QuickPickItem::new(kind.label()))
            .to_vec();
        let Some(item) = self.host.show_quick_pick(picks, FILES_VIEW_PLACEHOLDER).await else {
            return Ok(());
        };
        self.settings
            .update(USE_EXPLORER_KEY, item.label == ListingKind::Explorer.label())
    }

    async fn set_explorer_view_with_folder(self: Rc<Self>) -> Result<()> {
        let picks = vec![QuickPickItem::new("Yes"), QuickPickItem::new("No")];
        let Some(item) = self.host.show_quick_pick(picks, WITH_FOLDER_PLACEHOLDER).await else {
            return Ok(());
        };
        self.settings
            .update(WITH_FOLDER_KEY, item.label.eq_ignore_ascii_case("yes"))
    }
}

fn branch_pick(git_ref: &GitRef) -> QuickPickItem {
    let description = match git_ref.kind {
        RefType::Head => git_ref.commit.clone(),
        RefType::Tag => format!("Tag at {}", git_ref.commit),
        RefType::RemoteHead => format!("Remote branch at {}", git_ref.commit),
    };
    QuickPickItem::described(git_ref.label(), description)
}

/// Owner of the command registrations.
///
/// Every callback spawns its handler on the current
/// [`tokio::task::LocalSet`] and returns at once; handler failures are
/// logged and never reach the invoker.
pub struct CommandCenter {
    context: Rc<CommandContext>,
    registrations: RefCell<Vec<Registration>>,
}

impl CommandCenter {
    /// Register every command with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandAlreadyRegistered`] when another instance
    /// still holds one of the identifiers. Registrations made before the
    /// failure are released.
    pub fn new(registry: &Rc<CommandRegistry>, context: CommandContext) -> Result<Self> {
        let context = Rc::new(context);
        let mut registrations = Vec::with_capacity(COMMANDS.len());

        for (id, method) in COMMANDS {
            match registry.register(id, dispatcher(id, method, &context)) {
                Ok(registration) => registrations.push(registration),
                Err(err) => {
                    registrations.iter().for_each(Disposable::dispose);
                    return Err(err);
                }
            }
        }

        tracing::debug!(commands = registrations.len(), "registered commands");
        Ok(Self {
            context,
            registrations: RefCell::new(registrations),
        })
    }

    /// Handle to the listing the commands act on.
    #[must_use]
    pub fn listing(&self) -> &ListingHandle {
        &self.context.listing
    }

    /// History view the commands drive.
    #[must_use]
    pub fn history(&self) -> &Rc<HistoryView> {
        &self.context.history
    }
}

fn dispatcher(
    id: &'static str,
    method: CommandMethod,
    context: &Rc<CommandContext>,
) -> CommandCallback {
    let context = Rc::clone(context);
    Rc::new(move |args| {
        let handler = method(Rc::clone(&context), args);
        tokio::task::spawn_local(async move {
            if let Err(err) = handler.await {
                tracing::warn!(command = id, error = %err, "command failed");
            }
        });
    })
}

impl Disposable for CommandCenter {
    fn dispose(&self) {
        for registration in self.registrations.borrow_mut().drain(..) {
            registration.dispose();
        }
    }
}

impl fmt::Debug for CommandCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCenter")
            .field("registrations", &self.registrations.borrow().len())
            .field("listing", &self.context.listing)
            .finish_non_exhaustive()
    }
}
