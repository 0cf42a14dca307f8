use serde::{Deserialize, Serialize};

use crate::path::Path;

/// `(systemCounter, epochCounter?)` — stamped into `created`/`modified` on
/// commit. Only `system_counter` is used for ordering in this core; the
/// epoch component is reserved (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub system_counter: i64,
    pub epoch_counter: Option<i64>,
}

impl Version {
    pub fn new(system_counter: i64) -> Self {
        Self {
            system_counter,
            epoch_counter: None,
        }
    }

    /// `[counter, epoch?]` wire shape.
    pub fn serialize(&self) -> (i64, Option<i64>) {
        (self.system_counter, self.epoch_counter)
    }
}

/// Selector for partial commits: any subset of
/// `{CREATED, MODIFIED, CHILDREN, DATA}`. A commit writes exactly the
/// selected attributes so unrelated concurrent work is not clobbered
/// (spec.md §3).
///
/// Backed by a `u8` bitset rather than a `HashSet` or an external bitflags
/// dependency — four fixed members never grow, so a handful of associated
/// constants plus bitwise ops is the idiomatic-enough fit here.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeAttributeSet(u8);

impl NodeAttributeSet {
    pub const CREATED: NodeAttributeSet = NodeAttributeSet(1 << 0);
    pub const MODIFIED: NodeAttributeSet = NodeAttributeSet(1 << 1);
    pub const CHILDREN: NodeAttributeSet = NodeAttributeSet(1 << 2);
    pub const DATA: NodeAttributeSet = NodeAttributeSet(1 << 3);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for NodeAttributeSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::fmt::Debug for NodeAttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::CREATED) {
            names.push("CREATED");
        }
        if self.contains(Self::MODIFIED) {
            names.push("MODIFIED");
        }
        if self.contains(Self::CHILDREN) {
            names.push("CHILDREN");
        }
        if self.contains(Self::DATA) {
            names.push("DATA");
        }
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// One tree entry. `path` is immutable identity; `created` is assigned at
/// creation and never changes; `modified` is updated on every data mutation;
/// `children` is the ordered set of direct-child name strings; `data_b64` is
/// the opaque user payload (treated as already-encoded octets — see
/// spec.md §3 "data_b64 : opaque bytes").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub path: Path,
    pub created: Version,
    pub modified: Version,
    pub children: Vec<String>,
    pub data_b64: Vec<u8>,
    /// Reserved: ephemeral-owner session id. Never read or enforced by this
    /// core (spec.md §3, §9 Open Questions).
    pub ephemeral_owner: Option<String>,
}

impl Node {
    pub fn new(path: Path, counter: i64, data_b64: Vec<u8>) -> Self {
        let version = Version::new(counter);
        Self {
            path,
            created: version,
            modified: version,
            children: Vec::new(),
            data_b64,
            ephemeral_owner: None,
        }
    }
}
