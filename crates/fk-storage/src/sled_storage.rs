use std::path::Path as FsPath;

use fk_core::{FkError, Node, NodeAttributeSet, Path};
use tracing::warn;

use crate::row::StateRow;
use crate::SystemStorage;

/// Maximum number of compare-and-swap retries against the *underlying*
/// sled key on unrelated write contention (distinct from the executor's
/// lease-acquisition backoff — this is local, sub-millisecond retry against
/// sled itself).
const CAS_RETRIES: u32 = 16;

/// `SystemStorage` backed by `sled`, a pure-Rust embedded KV store with a
/// native compare-and-swap primitive — the embedded-store analogue of the
/// DynamoDB `ConditionExpression` the original used (spec.md §6
/// "Conditional-update contract required from the storage driver").
///
/// Named trees:
///   state — path bytes      → bincode(StateRow)
///   users — session_id bytes → `[]` (membership row)
///   meta  — "counter:{shard}" → big-endian i64 (system counter)
pub struct SledSystemStorage {
    state: sled::Tree,
    users: sled::Tree,
    meta: sled::Tree,
    lock_lifetime: i64,
}

impl SledSystemStorage {
    pub fn open<P: AsRef<FsPath>>(dir: P, lock_lifetime: i64) -> Result<Self, FkError> {
        let db = sled::open(dir).map_err(|e| FkError::Storage(e.to_string()))?;
        let state = db
            .open_tree("state")
            .map_err(|e| FkError::Storage(e.to_string()))?;
        let users = db
            .open_tree("users")
            .map_err(|e| FkError::Storage(e.to_string()))?;
        let meta = db
            .open_tree("meta")
            .map_err(|e| FkError::Storage(e.to_string()))?;
        Ok(Self {
            state,
            users,
            meta,
            lock_lifetime,
        })
    }

    fn get_row(&self, path: &Path) -> Result<Option<(StateRow, sled::IVec)>, FkError> {
        match self
            .state
            .get(path.as_str())
            .map_err(|e| FkError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let row = StateRow::from_bytes(&bytes)
                    .map_err(|e| FkError::Serialization(e.to_string()))?;
                Ok(Some((row, bytes)))
            }
            None => Ok(None),
        }
    }
}

impl SystemStorage for SledSystemStorage {
    fn lock_node(&self, path: &Path, ts: i64) -> Result<(bool, Option<Node>), FkError> {
        for _ in 0..CAS_RETRIES {
            let existing = self.get_row(path)?;
            let (mut row, old_bytes) = match existing {
                Some((row, bytes)) => (row, Some(bytes)),
                None => (StateRow::default(), None),
            };

            let acquirable = match row.timelock {
                None => true,
                Some(tl) => tl < ts - self.lock_lifetime,
            };
            if !acquirable {
                return Ok((false, None));
            }

            // The node as observed at the moment the lease is taken.
            let observed = row.to_node(path);

            row.timelock = Some(ts);
            let new_bytes = row.to_bytes();

            let cas = self
                .state
                .compare_and_swap(path.as_str(), old_bytes, Some(new_bytes))
                .map_err(|e| FkError::Storage(e.to_string()))?;
            match cas {
                Ok(()) => return Ok((true, observed)),
                Err(_) => continue, // lost the race against unrelated contention; retry
            }
        }
        Err(FkError::Storage(format!(
            "lock_node: exhausted CAS retries for {path}"
        )))
    }

    fn unlock_node(&self, path: &Path, ts: i64) -> Result<(), FkError> {
        for _ in 0..CAS_RETRIES {
            let existing = self.get_row(path)?;
            let Some((mut row, old_bytes)) = existing else {
                return Ok(()); // nothing to unlock — idempotent
            };
            if row.timelock != Some(ts) {
                return Ok(()); // we no longer hold it — idempotent
            }
            row.timelock = None;
            let new_bytes = row.to_bytes();
            let cas = self
                .state
                .compare_and_swap(path.as_str(), Some(old_bytes), Some(new_bytes))
                .map_err(|e| FkError::Storage(e.to_string()))?;
            if cas.is_ok() {
                return Ok(());
            }
        }
        Err(FkError::Storage(format!(
            "unlock_node: exhausted CAS retries for {path}"
        )))
    }

    fn commit_node(&self, node: &Node, ts: i64, attrs: NodeAttributeSet) -> Result<bool, FkError> {
        for _ in 0..CAS_RETRIES {
            let existing = self.get_row(&node.path)?;
            let Some((mut row, old_bytes)) = existing else {
                return Ok(false); // no row to commit against — lease was never held
            };
            if row.timelock != Some(ts) {
                return Ok(false); // lease lost
            }
            row.apply(node, attrs);
            row.timelock = None;
            let new_bytes = row.to_bytes();
            let cas = self
                .state
                .compare_and_swap(node.path.as_str(), Some(old_bytes), Some(new_bytes))
                .map_err(|e| FkError::Storage(e.to_string()))?;
            if cas.is_ok() {
                return Ok(true);
            }
        }
        Err(FkError::Storage(format!(
            "commit_node: exhausted CAS retries for {}",
            node.path
        )))
    }

    fn delete_node(&self, node: &Node, ts: i64) -> Result<(), FkError> {
        for _ in 0..CAS_RETRIES {
            let existing = self.get_row(&node.path)?;
            let Some((row, old_bytes)) = existing else {
                return Ok(());
            };
            if row.timelock != Some(ts) {
                warn!(path = %node.path, "delete_node: lease mismatch, leaving row in place");
                return Ok(());
            }
            let cas = self
                .state
                .compare_and_swap(node.path.as_str(), Some(old_bytes), None)
                .map_err(|e| FkError::Storage(e.to_string()))?;
            if cas.is_ok() {
                return Ok(());
            }
        }
        Err(FkError::Storage(format!(
            "delete_node: exhausted CAS retries for {}",
            node.path
        )))
    }

    fn increase_system_counter(&self, shard: u8) -> Result<Option<i64>, FkError> {
        let key = format!("counter:{shard}");
        let result = self
            .meta
            .update_and_fetch(key.as_bytes(), |old| {
                let current = old
                    .and_then(|b| b.try_into().ok())
                    .map(i64::from_be_bytes)
                    .unwrap_or(0);
                Some((current + 1).to_be_bytes().to_vec())
            })
            .map_err(|e| FkError::Storage(e.to_string()))?;
        match result {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| FkError::Storage("corrupt counter row".to_string()))?;
                Ok(Some(i64::from_be_bytes(arr)))
            }
            None => {
                warn!("increase_system_counter: update_and_fetch returned no value");
                Ok(None)
            }
        }
    }

    fn delete_user(&self, session_id: &str) -> Result<bool, FkError> {
        let removed = self
            .users
            .remove(session_id.as_bytes())
            .map_err(|e| FkError::Storage(e.to_string()))?;
        Ok(removed.is_some())
    }

    fn lock_lifetime(&self) -> i64 {
        self.lock_lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fk_core::Version;

    fn temp_storage() -> SledSystemStorage {
        let dir = std::env::temp_dir().join(format!(
            "fk_storage_test_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        SledSystemStorage::open(&dir, 7).unwrap()
    }

    #[test]
    fn lock_then_relock_fails_until_unlocked() {
        let storage = temp_storage();
        let path = Path::parse("/a").unwrap();

        let (acquired, node) = storage.lock_node(&path, 100).unwrap();
        assert!(acquired);
        assert!(node.is_none());

        let (acquired2, _) = storage.lock_node(&path, 101).unwrap();
        assert!(!acquired2, "second worker must not acquire a held lease");

        storage.unlock_node(&path, 100).unwrap();
        let (acquired3, _) = storage.lock_node(&path, 102).unwrap();
        assert!(acquired3, "lease must be acquirable once released");
    }

    #[test]
    fn stale_lease_is_acquirable() {
        let storage = temp_storage();
        let path = Path::parse("/a").unwrap();
        storage.lock_node(&path, 100).unwrap();
        // ts far beyond lock_lifetime: condition `100 < ts - 7` holds.
        let (acquired, _) = storage.lock_node(&path, 200).unwrap();
        assert!(acquired, "expired lease must be stealable");
    }

    #[test]
    fn commit_after_lease_loss_returns_false() {
        let storage = temp_storage();
        let path = Path::parse("/a").unwrap();
        storage.lock_node(&path, 100).unwrap();
        // A second worker steals the stale lease.
        storage.lock_node(&path, 200).unwrap();

        let node = Node::new(path.clone(), 1, vec![]);
        let ok = storage
            .commit_node(&node, 100, NodeAttributeSet::CREATED)
            .unwrap();
        assert!(!ok, "commit under a lost lease must fail");
    }

    #[test]
    fn create_then_read_roundtrip() {
        let storage = temp_storage();
        let path = Path::parse("/a").unwrap();
        let (acquired, existing) = storage.lock_node(&path, 100).unwrap();
        assert!(acquired);
        assert!(existing.is_none());

        let mut node = Node::new(path.clone(), 1, b"AA==".to_vec());
        node.children = vec![];
        let committed = storage
            .commit_node(
                &node,
                100,
                NodeAttributeSet::CREATED | NodeAttributeSet::MODIFIED | NodeAttributeSet::CHILDREN,
            )
            .unwrap();
        assert!(committed);

        let (_, node2) = storage.lock_node(&path, 500).unwrap();
        let n = node2.expect("node should now be committed");
        assert_eq!(n.data_b64, b"AA==".to_vec());
        assert_eq!(n.created, Version::new(1));
    }

    #[test]
    fn counter_is_monotonic() {
        let storage = temp_storage();
        let a = storage.increase_system_counter(0).unwrap().unwrap();
        let b = storage.increase_system_counter(0).unwrap().unwrap();
        assert!(b > a);
    }

    #[test]
    fn delete_user_reports_absence() {
        let storage = temp_storage();
        assert!(!storage.delete_user("sX").unwrap());
        storage.users.insert("sX", &[]).unwrap();
        assert!(storage.delete_user("sX").unwrap());
        assert!(!storage.delete_user("sX").unwrap());
    }
}
