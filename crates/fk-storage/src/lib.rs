pub mod row;
pub mod sled_storage;

pub use row::StateRow;
pub use sled_storage::SledSystemStorage;

use fk_core::{FkError, Node, NodeAttributeSet, Path};

/// Abstract KV façade (spec.md §4.1): lock/unlock nodes, commit node
/// attributes, bump the system counter, and manage the users table. A
/// single implementation is injected at construction — no inheritance
/// hierarchy, just a capability trait (SPEC_FULL.md §9 redesign notes).
///
/// Implementations must offer a single-row compare-and-set as their only
/// multi-writer primitive; no multi-row transactions are assumed.
pub trait SystemStorage: Send + Sync {
    /// Conditionally sets `path`'s `timelock` to `ts`. Succeeds iff
    /// `timelock` is absent or stale (`timelock < ts - lock_lifetime()`).
    /// On success, returns the node as of the moment the lease was taken
    /// (`None` if no node is committed at `path` yet).
    fn lock_node(&self, path: &Path, ts: i64) -> Result<(bool, Option<Node>), FkError>;

    /// Clears `timelock` iff the current value equals `ts`. Idempotent.
    fn unlock_node(&self, path: &Path, ts: i64) -> Result<(), FkError>;

    /// Writes the selected attributes of `node` and clears `timelock` iff
    /// `timelock == ts`. Returns `false` only when the lease has been lost
    /// (timelock mismatch) — a fatal inconsistency for the calling
    /// operation (spec.md §4.1).
    fn commit_node(&self, node: &Node, ts: i64, attrs: NodeAttributeSet) -> Result<bool, FkError>;

    /// Removes the row iff `timelock == ts` — a silent no-op otherwise.
    /// Unlike `commit_node`, spec.md §4.1 gives this call no boolean
    /// contract to honor; a lost lease here is not reported back to the
    /// caller.
    fn delete_node(&self, node: &Node, ts: i64) -> Result<(), FkError>;

    /// Atomically increments and returns the new system counter value.
    /// `shard` is reserved for future sharding (spec.md §9); this core
    /// requires a single-shard implementation.
    fn increase_system_counter(&self, shard: u8) -> Result<Option<i64>, FkError>;

    /// Removes the users-table row. Returns `false` if absent.
    fn delete_user(&self, session_id: &str) -> Result<bool, FkError>;

    fn lock_lifetime(&self) -> i64;

    /// Exposes driver-specific conditional-failure classification. Declared
    /// per the original interface but not yet consumed by any executor
    /// (spec.md §9 Open Questions).
    fn classify_error(&self, err: &FkError) -> &'static str {
        match err {
            FkError::Storage(_) => "storage_error",
            FkError::Serialization(_) => "serialization_error",
            FkError::LeaseLost { .. } => "lease_lost",
            _ => "unknown",
        }
    }
}
