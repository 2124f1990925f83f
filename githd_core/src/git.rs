use std::path::{Path, PathBuf};

use futures::future::{FutureExt, LocalBoxFuture};
use githd_listing_api::{GitQuery, QueryError, QueryResult};

use crate::{repository::Repository, CommittedFile, Error, GitRef, LogEntry, Result};

/// [`GitQuery`] implementation running libgit2 calls on the blocking pool.
///
/// Each query opens the repository afresh, so the service itself holds no
/// libgit2 handle and never blocks the control thread.
#[derive(Debug, Clone)]
pub struct GitService {
    root: PathBuf,
}

impl GitService {
    /// Validate `path` as a repository and build a service for it.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Repository::open`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repository = Repository::open(path)?;
        Ok(Self {
            root: repository.root().to_path_buf(),
        })
    }

    /// Working tree root of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `op` against a freshly opened repository on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `op`, or [`Error::Task`] when the
    /// blocking task panicked.
    pub async fn with_repository<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let repository = Repository::open(&root)?;
            op(&repository)
        })
        .await?
    }
}

impl GitQuery for GitService {
    fn refs(&self) -> LocalBoxFuture<'_, QueryResult<Vec<GitRef>>> {
        async move {
            self.with_repository(|repo| repo.refs())
                .await
                .map_err(QueryError::from)
        }
        .boxed_local()
    }

    fn committed_files<'a>(
        &'a self,
        reference: &'a str,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<CommittedFile>>> {
        let reference = reference.to_owned();
        async move {
            self.with_repository(move |repo| repo.committed_files(&reference))
                .await
                .map_err(QueryError::from)
        }
        .boxed_local()
    }

    fn log<'a>(
        &'a self,
        branch: Option<&'a str>,
        skip: usize,
        count: usize,
    ) -> LocalBoxFuture<'a, QueryResult<Vec<LogEntry>>> {
        let branch = branch.map(str::to_owned);
        async move {
            self.with_repository(move |repo| repo.log(branch.as_deref(), skip, count))
                .await
                .map_err(QueryError::from)
        }
        .boxed_local()
    }
}

impl From<Error> for QueryError {
    fn from(error: Error) -> Self {
        match error {
            Error::UnknownRef { reference } => Self::UnknownRef { reference },
            Error::Query { source } => source,
            other => Self::message(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ref_keeps_its_kind() {
        let err = QueryError::from(Error::UnknownRef {
            reference: "nope".into(),
        });
        assert_eq!(
            err,
            QueryError::UnknownRef {
                reference: "nope".into()
            }
        );
    }

    #[test]
    fn other_errors_become_messages() {
        let err = QueryError::from(Error::NotARepository {
            path: "/tmp/x".into(),
        });
        assert!(matches!(err, QueryError::Failure { message } if message.contains("/tmp/x")));
    }
}
