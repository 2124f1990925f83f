//! Diff resources: addressable identifiers pairing a file path with a ref.
//!
//! A resource is made of three parts:
//! - the scheme, always [`GIT_SCHEME`]
//! - a display path, the file path optionally suffixed with [`DIFF_TARGET_SUFFIX`]
//! - a JSON query `{"path": <absolute path>, "ref": <ref>}`
//!
//! Only the query is read back by [`decode`], so the display path never
//! affects which file version is resolved.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

/// Scheme tag of every diff resource.
pub const GIT_SCHEME: &str = "git";
/// Extension appended to the display path of a marked diff target.
pub const DIFF_TARGET_SUFFIX: &str = ".git";

// `?` separates the path from the query and `%` introduces escapes.
const PATH_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'%').add(b'?');
const QUERY_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'%');

/// Errors produced when a resource was not built by [`encode`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Resource uses another scheme.
    #[error("expected a `git` resource, found scheme `{scheme}`")]
    WrongScheme {
        /// Scheme found on the resource.
        scheme: String,
    },
    /// Textual form has no `scheme:` prefix.
    #[error("resource `{resource}` has no scheme")]
    MissingScheme {
        /// Offending input.
        resource: String,
    },
    /// Resource carries no query payload.
    #[error("resource has no query payload")]
    MissingQuery,
    /// A percent escape does not decode to UTF-8.
    #[error("resource contains an invalid escape sequence")]
    InvalidEscape,
    /// The query is not a `{path, ref}` JSON object.
    #[error("invalid resource payload: {source}")]
    InvalidPayload {
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Addressable identifier of one side of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffResource {
    scheme: String,
    path: String,
    query: String,
}

impl DiffResource {
    /// Scheme tag.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Display path, including the diff-target suffix when marked.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw JSON payload.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether [`encode`] marked this resource as a diff target.
    ///
    /// The display path is compared with the path in the query, so a file
    /// whose own name ends in [`DIFF_TARGET_SUFFIX`] is not mistaken for one.
    #[must_use]
    pub fn is_diff_target(&self) -> bool {
        serde_json::from_str::<Payload>(&self.query).is_ok_and(|payload| {
            self.path.strip_suffix(DIFF_TARGET_SUFFIX) == Some(payload.path.as_str())
        })
    }
}

/// Fields recovered from a [`DiffResource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResource {
    /// Absolute path of the file.
    pub path: Utf8PathBuf,
    /// Commit-ish whose content is wanted.
    pub reference: String,
}

#[derive(Deserialize)]
struct Payload {
    path: String,
    #[serde(rename = "ref")]
    reference: String,
}

/// Build the resource addressing `path` at `reference`.
#[must_use]
pub fn encode(path: &Utf8Path, reference: &str, mark_as_diff_target: bool) -> DiffResource {
    let display = if mark_as_diff_target {
        format!("{path}{DIFF_TARGET_SUFFIX}")
    } else {
        path.to_string()
    };
    let query = serde_json::json!({ "path": path.as_str(), "ref": reference }).to_string();

    DiffResource {
        scheme: GIT_SCHEME.to_owned(),
        path: display,
        query,
    }
}

/// Recover the path and ref a resource was built from.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the resource has another scheme or its
/// query is not the JSON object written by [`encode`].
pub fn decode(resource: &DiffResource) -> Result<DecodedResource, DecodeError> {
    if resource.scheme != GIT_SCHEME {
        return Err(DecodeError::WrongScheme {
            scheme: resource.scheme.clone(),
        });
    }
    if resource.query.is_empty() {
        return Err(DecodeError::MissingQuery);
    }

    let payload: Payload = serde_json::from_str(&resource.query)
        .map_err(|source| DecodeError::InvalidPayload { source })?;
    Ok(DecodedResource {
        path: Utf8PathBuf::from(payload.path),
        reference: payload.reference,
    })
}

/// The left and right sides of a commit diff: `reference~` against `reference`.
#[must_use]
pub fn commit_diff_pair(path: &Utf8Path, reference: &str) -> (DiffResource, DiffResource) {
    (
        encode(path, &format!("{reference}~"), false),
        encode(path, reference, false),
    )
}

impl fmt::Display for DiffResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}?{}",
            self.scheme,
            utf8_percent_encode(&self.path, PATH_ESCAPES),
            utf8_percent_encode(&self.query, QUERY_ESCAPES)
        )
    }
}

impl FromStr for DiffResource {
    type Err = DecodeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = input
            .split_once(':')
            .ok_or_else(|| DecodeError::MissingScheme {
                resource: input.to_owned(),
            })?;
        let (path, query) = rest.split_once('?').ok_or(DecodeError::MissingQuery)?;

        Ok(Self {
            scheme: scheme.to_owned(),
            path: unescape(path)?,
            query: unescape(query)?,
        })
    }
}

fn unescape(part: &str) -> Result<String, DecodeError> {
    percent_decode_str(part)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| DecodeError::InvalidEscape)
}
