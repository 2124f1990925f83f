use futures::future::LocalBoxFuture;

use crate::{uri::DiffResource, CommittedFile, Result};

/// One entry of a single-choice picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickPickItem {
    /// Primary text; also the value handed back on selection.
    pub label: String,
    /// Secondary text shown next to the label.
    pub description: Option<String>,
}

impl QuickPickItem {
    /// Item without a description.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    /// Item with a description.
    #[must_use]
    pub fn described(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: Some(description.into()),
        }
    }
}

/// Presentation options for a diff editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffOptions {
    /// Open in a reusable preview tab instead of a pinned one.
    pub preview: bool,
}

/// Positional argument supplied by the host when invoking a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    /// A file entry from a committed-files listing.
    File(CommittedFile),
    /// Free text.
    Text(String),
}

/// Something holding registrations or listeners that must be released.
pub trait Disposable {
    /// Release everything. Calling it twice is harmless.
    fn dispose(&self);
}

/// The interactive environment githd runs in.
///
/// Every returned future is a suspension point: the handler awaiting it
/// yields the control thread until the host delivers the result.
pub trait Host {
    /// Current text of the source-control input box.
    fn scm_input_value(&self) -> String;

    /// Present a single-choice picker. `None` means the user dismissed it.
    fn show_quick_pick(
        &self,
        items: Vec<QuickPickItem>,
        placeholder: &'static str,
    ) -> LocalBoxFuture<'_, Option<QuickPickItem>>;

    /// Present a free-text prompt. `None` means the user dismissed it.
    fn show_input_box(&self, placeholder: &'static str) -> LocalBoxFuture<'_, Option<String>>;

    /// Open and focus the virtual document identified by `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Host`] when the document cannot be shown.
    fn show_document(&self, uri: &'static str) -> LocalBoxFuture<'_, Result<()>>;

    /// Move the cursor of the focused document to its first line.
    fn cursor_top(&self);

    /// Open a two-pane diff of `left` against `right`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Host`] when the diff cannot be opened.
    fn open_diff(
        &self,
        left: DiffResource,
        right: DiffResource,
        title: String,
        options: DiffOptions,
    ) -> LocalBoxFuture<'_, Result<()>>;

    /// Switch the source-control panel to the named providers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Host`] when the switch is rejected.
    fn switch_scm(&self, providers: &'static [&'static str]) -> LocalBoxFuture<'_, Result<()>>;
}
