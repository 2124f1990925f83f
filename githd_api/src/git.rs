use serde::{Deserialize, Serialize};

/// Kind of reference reported by the git query facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    /// Local branch head (`refs/heads/*`).
    Head,
    /// Tag (`refs/tags/*`), peeled to the tagged commit.
    Tag,
    /// Remote tracking branch (`refs/remotes/*`).
    RemoteHead,
}

/// A named pointer to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    /// Short name such as `main`, `v1.0` or `origin/main`.
    #[serde(default)]
    pub name: Option<String>,
    /// Object id of the commit the ref points at.
    pub commit: String,
    /// Reference kind.
    #[serde(rename = "type")]
    pub kind: RefType,
}

impl GitRef {
    /// Construct a named ref.
    #[must_use]
    pub fn new(name: impl Into<String>, commit: impl Into<String>, kind: RefType) -> Self {
        Self {
            name: Some(name.into()),
            commit: commit.into(),
            kind,
        }
    }

    /// Name shown in pickers; unnamed refs fall back to their commit.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.commit)
    }
}

/// How a file changed in a commit, relative to the first parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// File only exists in the commit.
    Added,
    /// File only exists in the parent.
    Deleted,
    /// File exists on both sides with modifications.
    Modified,
    /// File path changed between parent and commit.
    Renamed,
    /// File content copied from another location.
    Copied,
    /// File type changed (e.g., regular file -> symlink).
    TypeChange,
}

impl FileStatus {
    /// Single-letter status code, as printed by `git show --name-status`.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::TypeChange => 'T',
        }
    }
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommittedFile {
    /// Absolute path of the file in the working tree.
    pub path: String,
    /// Path relative to the repository root, used for display.
    pub relative_path: String,
    /// Change kind.
    pub status: FileStatus,
}

impl CommittedFile {
    /// Construct a committed file entry.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        relative_path: impl Into<String>,
        status: FileStatus,
    ) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            status,
        }
    }

    /// Final path component of the relative path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// One commit as listed by the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Full object id.
    pub sha: String,
    /// First line of the commit message.
    pub subject: String,
    /// Author display name.
    pub author: String,
    /// Author email, when recorded.
    #[serde(default)]
    pub email: Option<String>,
    /// Commit time in seconds since the epoch.
    pub timestamp: i64,
}

impl LogEntry {
    /// Abbreviated object id used for display.
    #[must_use]
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}
