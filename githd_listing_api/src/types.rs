use serde::{Deserialize, Serialize};

use githd_api::CommittedFile;

/// The two interchangeable committed-file presentations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    /// Flat list in the source-control panel.
    Scm,
    /// Tree in the explorer panel, optionally grouped by folder.
    Explorer,
}

impl ListingKind {
    /// Kind selected by the `useExplorer` preference.
    #[must_use]
    pub const fn from_use_explorer(use_explorer: bool) -> Self {
        if use_explorer {
            Self::Explorer
        } else {
            Self::Scm
        }
    }

    /// Label used by the view picker.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scm => "SCM",
            Self::Explorer => "Explorer",
        }
    }
}

/// Node of an explorer tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ListingNode {
    /// Folder holding further nodes. `name` may span several path components.
    Folder {
        /// Display name, e.g. `src` or `src/ui`.
        name: String,
        /// Folders first, then files, each sorted by name.
        children: Vec<ListingNode>,
    },
    /// Leaf entry.
    File {
        /// The committed file behind the leaf.
        file: CommittedFile,
    },
}

impl ListingNode {
    /// Number of file leaves below (and including) this node.
    #[must_use]
    pub fn file_count(&self) -> usize {
        match self {
            Self::Folder { children, .. } => children.iter().map(Self::file_count).sum(),
            Self::File { .. } => 1,
        }
    }
}

/// Render-ready state of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ListingView {
    /// Nothing selected.
    #[default]
    Empty,
    /// Flat listing of the files committed at `reference`.
    Flat {
        /// Ref being displayed.
        reference: String,
        /// Files in facade order.
        files: Vec<CommittedFile>,
    },
    /// Explorer tree of the files committed at `reference`.
    Tree {
        /// Ref being displayed.
        reference: String,
        /// Root nodes.
        nodes: Vec<ListingNode>,
    },
}

impl ListingView {
    /// Ref displayed by the view, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Flat { reference, .. } | Self::Tree { reference, .. } => Some(reference),
        }
    }
}

/// Errors surfaced by the git query facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The ref does not name a commit.
    #[error("unknown ref `{reference}`")]
    UnknownRef {
        /// Ref as supplied by the caller.
        reference: String,
    },
    /// Generic failure reported by the backend.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl QueryError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for git queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;
