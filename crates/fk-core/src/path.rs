use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FkError;

/// A POSIX-style absolute path into the coordination namespace (`/a/b/c`).
///
/// Root is `"/"`. Paths never carry a trailing slash (except root itself) and
/// never contain empty segments (`//`, `/a//b`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(String);

impl Path {
    pub const ROOT: &'static str = "/";

    /// Parse and validate an absolute path. Rejects relative paths, trailing
    /// slashes (other than root), and empty segments.
    pub fn parse(raw: &str) -> Result<Self, FkError> {
        if !raw.starts_with('/') {
            return Err(FkError::InvalidPath(format!(
                "path must be absolute: {raw}"
            )));
        }
        if raw.len() > 1 && raw.ends_with('/') {
            return Err(FkError::InvalidPath(format!(
                "path must not end with '/': {raw}"
            )));
        }
        if raw != "/" && raw.split('/').skip(1).any(|seg| seg.is_empty()) {
            return Err(FkError::InvalidPath(format!(
                "path must not contain empty segments: {raw}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lexical parent of this path. `None` only for root — the root has
    /// no parent and must exist implicitly (spec.md §3).
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let trimmed = &self.0[..self.0.rfind('/').unwrap()];
        if trimmed.is_empty() {
            Some(Path::root())
        } else {
            Some(Path(trimmed.to_string()))
        }
    }

    /// The last path segment ("name" of this node within its parent's
    /// children list). Undefined (panics) for root — callers must not ask a
    /// root node for its name.
    pub fn name(&self) -> &str {
        assert!(!self.is_root(), "root path has no name");
        &self.0[self.0.rfind('/').unwrap() + 1..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.0)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn parent_of_top_level_is_root() {
        let p = Path::parse("/a").unwrap();
        assert_eq!(p.parent(), Some(Path::root()));
        assert_eq!(p.name(), "a");
    }

    #[test]
    fn parent_of_nested_path() {
        let p = Path::parse("/a/b/c").unwrap();
        assert_eq!(p.parent(), Some(Path::parse("/a/b").unwrap()));
        assert_eq!(p.name(), "c");
    }

    #[test]
    fn rejects_relative_and_trailing_slash() {
        assert!(Path::parse("a/b").is_err());
        assert!(Path::parse("/a/").is_err());
        assert!(Path::parse("/a//b").is_err());
    }
}
