//! Core library for the githd history browser.
//!
//! The crate is layered around three primary responsibilities:
//! - git access (refs, committed files, history pages) behind [`git::GitService`]
//! - the command surface and the diff resources it hands to the host
//! - live reconfiguration of the committed-file listing

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Command registry, dispatcher and handlers.
pub mod commands;
/// Persistent settings and the preference snapshot.
pub mod config;
/// Activation and teardown of the whole command surface.
pub mod extension;
/// Async git facade used by the views.
pub mod git;
/// History document and its pagination state.
pub mod history;
/// Host environment contract (pickers, documents, diffs).
pub mod host;
/// Swappable handle to the active file listing.
pub mod listing;
/// Reaction to preference changes.
pub mod reconciler;
/// Git repository access built on libgit2.
pub mod repository;
/// Encoding of (path, ref) pairs into diff resources.
pub mod uri;

pub use githd_api::{CommittedFile, FileStatus, GitRef, LogEntry, RefType, ViewPreferences};
pub use githd_listing_api::{FileListing, GitQuery, ListingKind, ListingSink, ListingView};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Bare repositories have no working tree to diff against.
    #[error("repository at {path} is bare and unsupported")]
    BareRepository {
        /// Path of the repository lacking a working tree.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// The ref does not name a commit.
    #[error("unknown ref `{reference}`")]
    UnknownRef {
        /// Ref as supplied by the caller.
        reference: String,
    },
    /// A query through the git facade failed.
    #[error("git query failed: {source}")]
    Query {
        /// Error reported by the facade.
        #[from]
        source: githd_listing_api::QueryError,
    },
    /// A diff resource could not be decoded.
    #[error(transparent)]
    Decode {
        /// Decoding failure.
        #[from]
        source: uri::DecodeError,
    },
    /// The settings file is not valid JSON.
    #[error("invalid settings in {path}: {source}")]
    Settings {
        /// Settings file path.
        path: String,
        /// Parse or serialization error.
        #[source]
        source: serde_json::Error,
    },
    /// A command identifier is already taken in the registry.
    #[error("command `{id}` is already registered")]
    CommandAlreadyRegistered {
        /// Command identifier.
        id: String,
    },
    /// No handler is registered for the identifier.
    #[error("command `{id}` is not registered")]
    UnknownCommand {
        /// Command identifier.
        id: String,
    },
    /// A command was invoked without its required argument.
    #[error("command `{command}` requires a {expected} argument")]
    MissingArgument {
        /// Command identifier.
        command: &'static str,
        /// Description of the expected argument.
        expected: &'static str,
    },
    /// No ref is displayed by the active listing.
    #[error("no ref is selected in the committed files view")]
    NoActiveRef,
    /// The host environment rejected a request.
    #[error("host error: {message}")]
    Host {
        /// Message reported by the host.
        message: String,
    },
    /// A blocking git task was cancelled or panicked.
    #[error("background task failed: {source}")]
    Task {
        /// Join failure from the runtime.
        #[from]
        source: tokio::task::JoinError,
    },
}

impl Error {
    /// Construct a host error from any displayable message.
    #[must_use]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}
