//! Repository access built on top of libgit2.

use std::fmt;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use git2::{
    DiffFindOptions, Delta, ErrorClass, ErrorCode, ObjectType, Oid, Repository as GitRepository,
    Sort,
};

use crate::{
    uri::{self, DiffResource},
    CommittedFile, Error, FileStatus, GitRef, LogEntry, RefType, Result,
};

/// Lightweight handle to the repository whose history is browsed.
pub struct Repository {
    inner: GitRepository,
    root: PathBuf,
}

impl Repository {
    /// Open a repository from the given filesystem path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized, does not resolve
    /// to a git repository, or resolves to a bare repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::BareRepository {
                path: display_path(&canonical),
            })?;

        Ok(Self { inner: repo, root })
    }

    /// Returns the absolute path to the working tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists local branches, tags and remote branches, in that order.
    ///
    /// Symbolic refs such as `origin/HEAD` are skipped and annotated tags are
    /// peeled to the commit they tag.
    ///
    /// # Errors
    ///
    /// Propagates libgit2 failures while iterating references.
    pub fn refs(&self) -> Result<Vec<GitRef>> {
        let mut heads = Vec::new();
        let mut tags = Vec::new();
        let mut remotes = Vec::new();

        for reference in self.inner.references()? {
            let reference = reference?;
            if reference.symbolic_target().is_some() {
                continue;
            }
            let (Some(full_name), Some(short_name)) = (reference.name(), reference.shorthand())
            else {
                continue;
            };
            let bucket = if full_name.starts_with("refs/heads/") {
                (&mut heads, RefType::Head)
            } else if full_name.starts_with("refs/tags/") {
                (&mut tags, RefType::Tag)
            } else if full_name.starts_with("refs/remotes/") {
                (&mut remotes, RefType::RemoteHead)
            } else {
                continue;
            };

            let commit = match reference.peel_to_commit() {
                Ok(commit) => commit.id().to_string(),
                // Tags may point at trees or blobs.
                Err(err) if err.code() == ErrorCode::Peel => continue,
                Err(err) => return Err(Error::from(err)),
            };
            let (list, kind) = bucket;
            list.push(GitRef {
                name: Some(short_name.to_owned()),
                commit,
                kind,
            });
        }

        heads.extend(tags);
        heads.extend(remotes);
        Ok(heads)
    }

    /// Files changed by `reference` relative to its first parent.
    ///
    /// Root commits list every file as added. Renames are detected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRef`] when `reference` does not name a commit.
    pub fn committed_files(&self, reference: &str) -> Result<Vec<CommittedFile>> {
        let commit = self.resolve_commit(reference)?;
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() == 0 {
            None
        } else {
            Some(commit.parent(0)?.tree()?)
        };

        let mut diff = self
            .inner
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let files = diff
            .deltas()
            .filter_map(|delta| {
                let status = convert_status(delta.status())?;
                let file = if status == FileStatus::Deleted {
                    delta.old_file()
                } else {
                    delta.new_file()
                };
                let relative = file.path()?.to_string_lossy().replace('\\', "/");
                Some(CommittedFile {
                    path: display_path(&self.root.join(&relative)),
                    relative_path: relative,
                    status,
                })
            })
            .collect();
        Ok(files)
    }

    /// One page of history reachable from `branch` (or `HEAD`), newest first.
    ///
    /// An unborn `HEAD` yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRef`] when `branch` does not resolve.
    pub fn log(&self, branch: Option<&str>, skip: usize, count: usize) -> Result<Vec<LogEntry>> {
        let start = match branch {
            Some(branch) => self.resolve_commit(branch)?.id(),
            None => match self.head_oid()? {
                Some(oid) => oid,
                None => return Ok(Vec::new()),
            },
        };

        let mut walk = self.inner.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(start)?;

        walk.skip(skip)
            .take(count)
            .map(|oid| -> Result<LogEntry> {
                let commit = self.inner.find_commit(oid?)?;
                let author = commit.author();
                Ok(LogEntry {
                    sha: commit.id().to_string(),
                    subject: commit.summary().unwrap_or_default().to_owned(),
                    author: author.name().unwrap_or_default().to_owned(),
                    email: author.email().map(str::to_owned),
                    timestamp: commit.time().seconds(),
                })
            })
            .collect()
    }

    /// Content of `relative_path` at `reference`.
    ///
    /// Returns `None` when the file does not exist at that ref, or when the
    /// ref itself is missing (e.g. the parent of a root commit).
    ///
    /// # Errors
    ///
    /// Propagates libgit2 failures other than missing objects.
    pub fn file_at(&self, reference: &str, relative_path: &str) -> Result<Option<Vec<u8>>> {
        let commit = match self.resolve_commit(reference) {
            Ok(commit) => commit,
            Err(Error::UnknownRef { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(relative_path)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(Error::from(err)),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self.inner.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Read the file version a diff resource addresses.
    ///
    /// # Errors
    ///
    /// Returns a decode error for foreign resources and propagates
    /// [`Repository::file_at`] failures.
    pub fn resolve_resource(&self, resource: &DiffResource) -> Result<Option<Vec<u8>>> {
        let decoded = uri::decode(resource)?;
        let relative = self.relative_path(&decoded.path);
        self.file_at(&decoded.reference, &relative)
    }

    fn relative_path(&self, path: &Utf8Path) -> String {
        let absolute = Path::new(path.as_str());
        absolute
            .strip_prefix(&self.root)
            .unwrap_or(absolute)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn resolve_commit(&self, reference: &str) -> Result<git2::Commit<'_>> {
        let unknown = || Error::UnknownRef {
            reference: reference.to_owned(),
        };
        let object = match self.inner.revparse_single(reference) {
            Ok(object) => object,
            Err(err)
                if matches!(
                    err.code(),
                    ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous
                ) =>
            {
                return Err(unknown())
            }
            Err(err) => return Err(Error::from(err)),
        };
        object.peel_to_commit().map_err(|_| unknown())
    }

    fn head_oid(&self) -> Result<Option<Oid>> {
        match self.inner.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(err)
                if matches!(
                    (err.class(), err.code()),
                    (
                        ErrorClass::Reference,
                        ErrorCode::NotFound | ErrorCode::UnbornBranch
                    )
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(Error::from(err)),
        }
    }
}

const fn convert_status(delta: Delta) -> Option<FileStatus> {
    match delta {
        Delta::Added => Some(FileStatus::Added),
        Delta::Deleted => Some(FileStatus::Deleted),
        Delta::Modified => Some(FileStatus::Modified),
        Delta::Renamed => Some(FileStatus::Renamed),
        Delta::Copied => Some(FileStatus::Copied),
        Delta::Typechange => Some(FileStatus::TypeChange),
        _ => None,
    }
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_path_buf()
        .into_os_string()
        .to_string_lossy()
        .into_owned()
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
