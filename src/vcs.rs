//! Revision resolution and scoped checkouts.
//!
//! Checkouts are hard resets of the one shared working copy, so the
//! controller refuses to start a [`CheckoutSession`] on a dirty tree. The
//! session remembers where HEAD was on its first checkout and resets back
//! there when it ends, on every exit path.

use std::fmt;
use std::path::Path;

use git2::{ObjectType, Oid, Repository, ResetType, StatusOptions};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, VcsError};
use crate::version::ParsedVersion;

/// Immutable revision identifier (a full commit hash for git).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RevisionId(pub String);

impl RevisionId {
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub target: RevisionId,
}

/// Source-control operations the controller needs.
pub trait SourceControl {
    /// Where HEAD currently points.
    fn head(&self) -> std::result::Result<RevisionId, VcsError>;
    fn resolve(&self, reference: &str) -> std::result::Result<RevisionId, VcsError>;
    fn tags(&self) -> std::result::Result<Vec<Tag>, VcsError>;
    /// No staged, unstaged or untracked changes.
    fn is_clean(&self) -> std::result::Result<bool, VcsError>;
    /// Discards every uncommitted change.
    fn hard_reset(&self, revision: &RevisionId) -> std::result::Result<(), VcsError>;
}

/// [`SourceControl`] over a local git repository.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    pub fn open(path: &Path) -> std::result::Result<Self, VcsError> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    fn oid(revision: &RevisionId) -> std::result::Result<Oid, VcsError> {
        Oid::from_str(&revision.0).map_err(|_| VcsError::InvalidId(revision.0.clone()))
    }
}

impl SourceControl for GitRepository {
    fn head(&self) -> std::result::Result<RevisionId, VcsError> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(RevisionId(commit.id().to_string()))
    }

    fn resolve(&self, reference: &str) -> std::result::Result<RevisionId, VcsError> {
        let object = self
            .repo
            .revparse_single(reference)
            .map_err(|_| VcsError::UnknownRevision(reference.to_string()))?;
        let commit = object.peel_to_commit()?;
        Ok(RevisionId(commit.id().to_string()))
    }

    fn tags(&self) -> std::result::Result<Vec<Tag>, VcsError> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::with_capacity(names.len());
        for name in names.iter().flatten() {
            let object = self.repo.revparse_single(&format!("refs/tags/{name}"))?;
            match object.peel(ObjectType::Commit) {
                Ok(commit) => tags.push(Tag {
                    name: name.to_string(),
                    target: RevisionId(commit.id().to_string()),
                }),
                Err(err) => debug!(tag = name, error = %err, "tag does not point at a commit"),
            }
        }
        Ok(tags)
    }

    fn is_clean(&self) -> std::result::Result<bool, VcsError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        Ok(self.repo.statuses(Some(&mut opts))?.is_empty())
    }

    fn hard_reset(&self, revision: &RevisionId) -> std::result::Result<(), VcsError> {
        let object = self.repo.find_object(Self::oid(revision)?, None)?;
        self.repo.reset(&object, ResetType::Hard, None)?;
        Ok(())
    }
}

/// Highest semver tag in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
    pub version: semver::Version,
    pub revision: RevisionId,
}

pub struct RevisionController<S> {
    scm: S,
}

impl<S: SourceControl> RevisionController<S> {
    pub fn new(scm: S) -> Self {
        Self { scm }
    }

    pub fn scm(&self) -> &S {
        &self.scm
    }

    pub fn resolve_head(&self) -> Result<RevisionId> {
        self.scm
            .head()
            .map_err(|source| Error::UnresolvableRevision {
                reference: "HEAD".to_string(),
                source,
            })
    }

    pub fn resolve_revision(&self, reference: &str) -> Result<RevisionId> {
        self.scm
            .resolve(reference)
            .map_err(|source| Error::UnresolvableRevision {
                reference: reference.to_string(),
                source,
            })
    }

    /// Pick the tag with the highest version. Tags that do not parse are
    /// logged and ignored.
    pub fn resolve_latest_release_tag(&self) -> Result<ReleaseTag> {
        let mut latest: Option<ReleaseTag> = None;
        for tag in self.scm.tags()? {
            let version = match ParsedVersion::parse(&tag.name) {
                ParsedVersion::Parsed(v) => v,
                ParsedVersion::Unparsed(_) => {
                    warn!(tag = %tag.name, "ignoring tag that is not a semantic version");
                    continue;
                }
            };
            let newer = latest
                .as_ref()
                .map_or(true, |cur| version.cmp_precedence(&cur.version).is_gt());
            if newer {
                latest = Some(ReleaseTag {
                    name: tag.name,
                    version,
                    revision: tag.target,
                });
            }
        }
        latest.ok_or(Error::NoReleaseFound)
    }

    /// Start a checkout session; fails on a dirty working copy before any
    /// reset happens.
    pub fn begin(&self) -> Result<CheckoutSession<'_, S>> {
        if !self.scm.is_clean()? {
            return Err(Error::DirtyWorkingCopy);
        }
        Ok(CheckoutSession {
            scm: &self.scm,
            original: None,
        })
    }
}

/// Scope in which the working copy may be moved between revisions.
///
/// Dropping the session (or calling [`CheckoutSession::restore`]) resets to
/// the HEAD captured at the first checkout. Restore failures are logged.
pub struct CheckoutSession<'a, S: SourceControl> {
    scm: &'a S,
    original: Option<RevisionId>,
}

impl<S: SourceControl> CheckoutSession<'_, S> {
    /// Hard-reset to `revision`, then run `body` there.
    pub fn with_checkout<T>(&mut self, revision: &RevisionId, body: impl FnOnce() -> T) -> Result<T> {
        if self.original.is_none() {
            self.original = Some(self.scm.head()?);
        }
        info!(revision = %revision.short(), "checking out");
        self.scm.hard_reset(revision)?;
        Ok(body())
    }

    pub fn restore(mut self) {
        self.restore_original();
    }

    fn restore_original(&mut self) {
        let Some(original) = self.original.take() else {
            return;
        };
        match self.scm.hard_reset(&original) {
            Ok(()) => info!(revision = %original.short(), "restored working copy"),
            Err(err) => error!(
                revision = %original,
                error = %err,
                "failed to restore working copy"
            ),
        }
    }
}

impl<S: SourceControl> Drop for CheckoutSession<'_, S> {
    fn drop(&mut self) {
        self.restore_original();
    }
}
