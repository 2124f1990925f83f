use serde::{Deserialize, Serialize};

/// Setting selecting the explorer (tree) listing over the flat SCM listing.
pub const USE_EXPLORER_KEY: &str = "githd.committedFilesView.useExplorer";
/// Setting grouping explorer entries under their folders.
pub const WITH_FOLDER_KEY: &str = "githd.explorerView.withFolder";
/// Setting holding the history page size.
pub const COMMITS_COUNT_KEY: &str = "githd.logView.commitsCount";

/// Snapshot of the user preferences that drive the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPreferences {
    /// Show committed files in the explorer tree instead of the SCM list.
    pub use_explorer: bool,
    /// Group explorer entries by folder.
    pub with_folder: bool,
    /// Number of commits fetched per history page.
    pub commits_count: u32,
}

impl ViewPreferences {
    /// Page size used when the setting is absent.
    pub const DEFAULT_COMMITS_COUNT: u32 = 200;
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            use_explorer: false,
            with_folder: true,
            commits_count: Self::DEFAULT_COMMITS_COUNT,
        }
    }
}
