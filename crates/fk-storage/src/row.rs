use serde::{Deserialize, Serialize};

use fk_core::{Node, NodeAttributeSet, Path, Version};

/// On-disk shape of a single path's state-table row (spec.md §6 "State
/// table, keyed by path"). `created`/`modified` are `None` until the node's
/// first successful create commit — a row can exist with only `timelock`
/// set (a lock held on a path that has no node yet, e.g. the target of an
/// in-flight `create_node`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateRow {
    pub created: Option<Version>,
    pub modified: Option<Version>,
    pub children: Vec<String>,
    pub data: Vec<u8>,
    pub timelock: Option<i64>,
}

impl StateRow {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("StateRow serialization is infallible")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// The row represents a committed node once `created` has been written
    /// by a successful create commit. Root is a standing exception: it
    /// "exists implicitly" (spec.md §3 invariant 3) even though it is never
    /// itself the target of a `create_node` — its row, if any, only ever
    /// picks up a `CHILDREN` write from its first child's creation.
    pub fn to_node(&self, path: &Path) -> Option<Node> {
        if path.is_root() {
            return Some(Node {
                path: path.clone(),
                created: self.created.unwrap_or_else(|| Version::new(0)),
                modified: self.modified.unwrap_or_else(|| Version::new(0)),
                children: self.children.clone(),
                data_b64: self.data.clone(),
                ephemeral_owner: None,
            });
        }
        let created = self.created?;
        let modified = self.modified.unwrap_or(created);
        Some(Node {
            path: path.clone(),
            created,
            modified,
            children: self.children.clone(),
            data_b64: self.data.clone(),
            ephemeral_owner: None,
        })
    }

    /// Apply the selected attributes of `node` onto this row. `DATA` is
    /// physically written whenever `CREATED` is selected (a brand-new row
    /// carries its data regardless of the formal attribute selector — see
    /// SPEC_FULL.md §6) or when `DATA` is explicitly selected.
    pub fn apply(&mut self, node: &Node, attrs: NodeAttributeSet) {
        if attrs.contains(NodeAttributeSet::CREATED) {
            self.created = Some(node.created);
        }
        if attrs.contains(NodeAttributeSet::MODIFIED) {
            self.modified = Some(node.modified);
        }
        if attrs.contains(NodeAttributeSet::CHILDREN) {
            self.children = node.children.clone();
        }
        if attrs.contains(NodeAttributeSet::DATA) || attrs.contains(NodeAttributeSet::CREATED) {
            self.data = node.data_b64.clone();
        }
    }
}
