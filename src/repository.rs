//! Repository name resolution
//!
//! Splits a runner deployment's `repository` string into owner and name.
//! With more than one `/`, the owner is the first segment and the name is the
//! last; anything in between is dropped. Existing deployments rely on this,
//! so it is kept rather than rejected.

use std::fmt;

/// Repository owner: the first `/`-separated segment, or `""` without a `/`
pub fn owner(repo: &str) -> &str {
    match repo.split_once('/') {
        Some((owner, _)) => owner,
        None => "",
    }
}

/// Repository name: the last `/`-separated segment, or the whole string
pub fn name(repo: &str) -> &str {
    match repo.rsplit_once('/') {
        Some((_, name)) => name,
        None => repo,
    }
}

/// An (owner, name) pair resolved from a repository string
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    /// Owning user or organization (may be empty)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepositoryRef {
    /// Resolve a repository string into owner and name
    pub fn parse(repo: &str) -> Self {
        Self {
            owner: owner(repo).to_string(),
            name: name(repo).to_string(),
        }
    }

    /// Returns true if the repository string had no owner segment
    pub fn is_ownerless(&self) -> bool {
        self.owner.is_empty()
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
