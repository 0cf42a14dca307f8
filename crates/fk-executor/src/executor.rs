use async_trait::async_trait;
use tracing::warn;

use fk_core::{
    constants::COUNTER_SHARD, CreateNode, DeleteNode, DeregisterSession, Node, NodeAttributeSet,
    Reason, Reply, SetData,
};
use fk_distributor::{Client, DistributorEvent, DistributorQueue};
use fk_storage::SystemStorage;

use crate::lock::{acquire_lock, LockError, RetryPolicy};

/// Bounds shared by every executor's lock-acquisition loops (SPEC_FULL.md
/// §6). Both the target path and a parent path retry against the same
/// attempt cap; only the base sleep differs (`RetryPolicy::target` vs
/// `RetryPolicy::parent`).
#[derive(Clone, Copy, Debug)]
pub struct ExecutorConfig {
    pub max_lock_attempts: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_lock_attempts: 3,
        }
    }
}

fn lock_failure(err: LockError) -> Reply {
    match err {
        LockError::RetryExhausted => Reply::failure(Reason::RetryExhausted),
        LockError::Storage(e) => {
            warn!(error = %e, "storage error while acquiring lease");
            Reply::failure(Reason::Unknown)
        }
    }
}

/// The three-phase write-path state machine (spec.md §4.4): `lock_and_read`
/// reads and locks whatever rows the operation needs, `commit_and_unlock`
/// performs the durable write and releases the leases, `distributor_push`
/// hands the committed mutation to the distributor queue. Each of the first
/// two phases returns `(ok, reply)`; a caller stops at the first `false`
/// instead of invoking the next phase (spec.md §6).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn lock_and_read(&mut self, storage: &dyn SystemStorage) -> (bool, Reply);

    async fn commit_and_unlock(&mut self, storage: &dyn SystemStorage) -> (bool, Reply);

    async fn distributor_push(&self, queue: &dyn DistributorQueue, client: &Client);
}

pub struct CreateNodeExecutor {
    op: CreateNode,
    config: ExecutorConfig,
    ts: Option<i64>,
    parent_ts: Option<i64>,
    parent_node: Option<Node>,
    counter: Option<i64>,
    new_node: Option<Node>,
}

impl CreateNodeExecutor {
    pub fn new(op: CreateNode, config: ExecutorConfig) -> Self {
        Self {
            op,
            config,
            ts: None,
            parent_ts: None,
            parent_node: None,
            counter: None,
            new_node: None,
        }
    }
}

#[async_trait]
impl Executor for CreateNodeExecutor {
    async fn lock_and_read(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let (ts, existing) = match acquire_lock(
            storage,
            &self.op.path,
            RetryPolicy::target(self.config.max_lock_attempts),
        )
        .await
        {
            Ok(v) => v,
            Err(e) => return (false, lock_failure(e)),
        };
        self.ts = Some(ts);

        if existing.is_some() {
            let _ = storage.unlock_node(&self.op.path, ts);
            return (false, Reply::failure_path(Reason::NodeExists, &self.op.path));
        }

        let Some(parent_path) = self.op.path.parent() else {
            // The path is root, which can never be created (spec.md §4.4.1
            // edge case: root already exists implicitly).
            let _ = storage.unlock_node(&self.op.path, ts);
            return (false, Reply::failure_path(Reason::NodeExists, &self.op.path));
        };

        let (parent_ts, parent_node) = match acquire_lock(
            storage,
            &parent_path,
            RetryPolicy::parent(self.config.max_lock_attempts),
        )
        .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = storage.unlock_node(&self.op.path, ts);
                return (false, lock_failure(e));
            }
        };
        self.parent_ts = Some(parent_ts);

        let Some(parent_node) = parent_node else {
            let _ = storage.unlock_node(&parent_path, parent_ts);
            let _ = storage.unlock_node(&self.op.path, ts);
            return (
                false,
                Reply::failure_path(Reason::NodeDoesntExist, &parent_path),
            );
        };
        self.parent_node = Some(parent_node);

        (true, Reply::empty())
    }

    async fn commit_and_unlock(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let ts = self.ts.expect("lock_and_read must run first");
        let parent_ts = self.parent_ts.expect("lock_and_read must run first");
        let mut parent = self.parent_node.clone().expect("lock_and_read must run first");

        let counter = match storage.increase_system_counter(COUNTER_SHARD) {
            Ok(Some(c)) => c,
            Ok(None) | Err(_) => return (false, Reply::failure(Reason::Unknown)),
        };

        let new_node = Node::new(self.op.path.clone(), counter, self.op.data_b64.clone());

        parent.children.push(self.op.path.name().to_string());
        match storage.commit_node(&parent, parent_ts, NodeAttributeSet::CHILDREN) {
            Ok(true) => {}
            Ok(false) => warn!(path = %parent.path, "parent commit lost its lease; child create proceeds anyway"),
            Err(e) => warn!(path = %parent.path, error = %e, "parent commit failed"),
        }

        let attrs = NodeAttributeSet::CREATED | NodeAttributeSet::MODIFIED | NodeAttributeSet::CHILDREN;
        match storage.commit_node(&new_node, ts, attrs) {
            Ok(true) => {}
            Ok(false) => return (false, Reply::failure(Reason::Unknown)),
            Err(_) => return (false, Reply::failure(Reason::Unknown)),
        }

        self.counter = Some(counter);
        self.parent_node = Some(parent);
        self.new_node = Some(new_node);
        (true, Reply::ok())
    }

    async fn distributor_push(&self, queue: &dyn DistributorQueue, client: &Client) {
        let counter = self.counter.expect("commit_and_unlock must run first");
        let node = self.new_node.clone().expect("commit_and_unlock must run first");
        let parent = self.parent_node.clone().expect("commit_and_unlock must run first");
        if let Err(e) = queue.push(counter, DistributorEvent::CreateNode { node, parent }, client) {
            warn!(error = %e, "distributor push failed");
        }
    }
}

pub struct SetDataExecutor {
    op: SetData,
    config: ExecutorConfig,
    ts: Option<i64>,
    node: Option<Node>,
    counter: Option<i64>,
}

impl SetDataExecutor {
    pub fn new(op: SetData, config: ExecutorConfig) -> Self {
        Self {
            op,
            config,
            ts: None,
            node: None,
            counter: None,
        }
    }
}

#[async_trait]
impl Executor for SetDataExecutor {
    async fn lock_and_read(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let (ts, node) = match acquire_lock(
            storage,
            &self.op.path,
            RetryPolicy::target(self.config.max_lock_attempts),
        )
        .await
        {
            Ok(v) => v,
            Err(e) => return (false, lock_failure(e)),
        };
        self.ts = Some(ts);

        let Some(node) = node else {
            let _ = storage.unlock_node(&self.op.path, ts);
            return (false, Reply::failure_path(Reason::NodeDoesntExist, &self.op.path));
        };
        self.node = Some(node);
        (true, Reply::empty())
    }

    async fn commit_and_unlock(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let ts = self.ts.expect("lock_and_read must run first");
        let mut node = self.node.clone().expect("lock_and_read must run first");

        let counter = match storage.increase_system_counter(COUNTER_SHARD) {
            Ok(Some(c)) => c,
            Ok(None) | Err(_) => return (false, Reply::failure(Reason::Unknown)),
        };

        node.modified = fk_core::Version::new(counter);
        node.data_b64 = self.op.data_b64.clone();

        match storage.commit_node(&node, ts, NodeAttributeSet::MODIFIED) {
            Ok(true) => {}
            Ok(false) | Err(_) => return (false, Reply::failure(Reason::Unknown)),
        }

        self.counter = Some(counter);
        self.node = Some(node);
        (true, Reply::ok())
    }

    async fn distributor_push(&self, queue: &dyn DistributorQueue, client: &Client) {
        let counter = self.counter.expect("commit_and_unlock must run first");
        let node = self.node.clone().expect("commit_and_unlock must run first");
        if let Err(e) = queue.push(counter, DistributorEvent::SetData { node }, client) {
            warn!(error = %e, "distributor push failed");
        }
    }
}

pub struct DeleteNodeExecutor {
    op: DeleteNode,
    config: ExecutorConfig,
    ts: Option<i64>,
    parent_ts: Option<i64>,
    node: Option<Node>,
    parent_node: Option<Node>,
    counter: Option<i64>,
}

impl DeleteNodeExecutor {
    pub fn new(op: DeleteNode, config: ExecutorConfig) -> Self {
        Self {
            op,
            config,
            ts: None,
            parent_ts: None,
            node: None,
            parent_node: None,
            counter: None,
        }
    }
}

#[async_trait]
impl Executor for DeleteNodeExecutor {
    async fn lock_and_read(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let (ts, existing) = match acquire_lock(
            storage,
            &self.op.path,
            RetryPolicy::target(self.config.max_lock_attempts),
        )
        .await
        {
            Ok(v) => v,
            Err(e) => return (false, lock_failure(e)),
        };
        self.ts = Some(ts);

        let Some(node) = existing else {
            let _ = storage.unlock_node(&self.op.path, ts);
            return (false, Reply::failure_path(Reason::NodeDoesntExist, &self.op.path));
        };

        // Root is immutable and can never be deleted (spec.md §4.4.3 edge
        // case 4 reuses `not_empty` for this — there is no dedicated reason).
        if node.path.is_root() || !node.children.is_empty() {
            let _ = storage.unlock_node(&self.op.path, ts);
            return (false, Reply::failure_path(Reason::NotEmpty, &self.op.path));
        }

        let parent_path = node
            .path
            .parent()
            .expect("non-root node always has a parent");
        let (parent_ts, parent_node) = match acquire_lock(
            storage,
            &parent_path,
            RetryPolicy::parent(self.config.max_lock_attempts),
        )
        .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = storage.unlock_node(&self.op.path, ts);
                return (false, lock_failure(e));
            }
        };
        self.parent_ts = Some(parent_ts);
        self.parent_node = parent_node;
        self.node = Some(node);

        (true, Reply::empty())
    }

    async fn commit_and_unlock(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        let ts = self.ts.expect("lock_and_read must run first");
        let parent_ts = self.parent_ts.expect("lock_and_read must run first");
        let node = self.node.clone().expect("lock_and_read must run first");
        let mut parent = self
            .parent_node
            .clone()
            .unwrap_or_else(|| Node::new(node.path.parent().unwrap(), 0, vec![]));

        let counter = match storage.increase_system_counter(COUNTER_SHARD) {
            Ok(Some(c)) => c,
            Ok(None) | Err(_) => return (false, Reply::failure(Reason::Unknown)),
        };

        parent.children.retain(|name| name != node.path.name());
        match storage.commit_node(&parent, parent_ts, NodeAttributeSet::CHILDREN) {
            Ok(true) => {}
            Ok(false) => warn!(path = %parent.path, "parent commit lost its lease; child delete proceeds anyway"),
            Err(e) => warn!(path = %parent.path, error = %e, "parent commit failed"),
        }

        if let Err(e) = storage.delete_node(&node, ts) {
            warn!(path = %node.path, error = %e, "delete_node storage error");
            return (false, Reply::failure(Reason::Unknown));
        }

        self.counter = Some(counter);
        self.parent_node = Some(parent);
        (true, Reply::ok())
    }

    async fn distributor_push(&self, queue: &dyn DistributorQueue, client: &Client) {
        let counter = self.counter.expect("commit_and_unlock must run first");
        let node = self.node.clone().expect("commit_and_unlock must run first");
        let parent = self.parent_node.clone().expect("commit_and_unlock must run first");
        if let Err(e) = queue.push(counter, DistributorEvent::DeleteNode { node, parent }, client) {
            warn!(error = %e, "distributor push failed");
        }
    }
}

pub struct DeregisterSessionExecutor {
    op: DeregisterSession,
}

impl DeregisterSessionExecutor {
    pub fn new(op: DeregisterSession, _config: ExecutorConfig) -> Self {
        Self { op }
    }
}

#[async_trait]
impl Executor for DeregisterSessionExecutor {
    async fn lock_and_read(&mut self, _storage: &dyn SystemStorage) -> (bool, Reply) {
        (true, Reply::empty())
    }

    async fn commit_and_unlock(&mut self, storage: &dyn SystemStorage) -> (bool, Reply) {
        match storage.delete_user(&self.op.session_id) {
            Ok(true) => {
                // TODO: sweep ephemeral nodes owned by this session once
                // ephemeral-owner tracking is wired up (spec.md §4.4.4).
                (true, Reply::ok_session(self.op.session_id.clone()))
            }
            Ok(false) => (
                false,
                Reply::failure_session(Reason::SessionDoesNotExist, self.op.session_id.clone()),
            ),
            Err(_) => (false, Reply::failure(Reason::Unknown)),
        }
    }

    async fn distributor_push(&self, _queue: &dyn DistributorQueue, _client: &Client) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use fk_core::{CreateFlags, Path};
    use fk_storage::SledSystemStorage;

    fn temp_storage(name: &str) -> SledSystemStorage {
        let dir = std::env::temp_dir().join(format!(
            "fk_executor_test_{}_{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        SledSystemStorage::open(&dir, 7).unwrap()
    }

    fn client() -> Client {
        Client {
            session_id: "s1".to_string(),
        }
    }

    #[tokio::test]
    async fn create_top_level_node_succeeds() {
        let storage = temp_storage("create_top_level");
        let op = CreateNode {
            path: Path::parse("/a").unwrap(),
            data_b64: b"AA==".to_vec(),
            flags: CreateFlags::default(),
        };
        let mut executor = CreateNodeExecutor::new(op, ExecutorConfig::default());

        let (ok, reply) = executor.lock_and_read(&storage).await;
        assert!(ok, "{reply:?}");
        let (ok, reply) = executor.commit_and_unlock(&storage).await;
        assert!(ok, "{reply:?}");
        assert_eq!(reply.status, Some("success"));
    }

    #[tokio::test]
    async fn create_existing_node_fails_with_node_exists() {
        let storage = temp_storage("create_existing");
        let path = Path::parse("/a").unwrap();
        let op = CreateNode {
            path: path.clone(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut first = CreateNodeExecutor::new(op.clone(), ExecutorConfig::default());
        first.lock_and_read(&storage).await;
        first.commit_and_unlock(&storage).await;

        let mut second = CreateNodeExecutor::new(op, ExecutorConfig::default());
        let (ok, reply) = second.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NodeExists));
    }

    #[tokio::test]
    async fn create_root_fails_with_node_exists() {
        let storage = temp_storage("create_root");
        let op = CreateNode {
            path: Path::root(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut executor = CreateNodeExecutor::new(op, ExecutorConfig::default());
        let (ok, reply) = executor.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NodeExists));
    }

    #[tokio::test]
    async fn create_child_missing_parent_fails() {
        let storage = temp_storage("create_missing_parent");
        let op = CreateNode {
            path: Path::parse("/a/b").unwrap(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut executor = CreateNodeExecutor::new(op, ExecutorConfig::default());
        let (ok, reply) = executor.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NodeDoesntExist));
        assert_eq!(reply.path.as_deref(), Some("/a"));
    }

    #[tokio::test]
    async fn set_data_on_missing_node_fails() {
        let storage = temp_storage("set_data_missing");
        let op = SetData {
            path: Path::parse("/a").unwrap(),
            data_b64: vec![],
            version: None,
        };
        let mut executor = SetDataExecutor::new(op, ExecutorConfig::default());
        let (ok, reply) = executor.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NodeDoesntExist));
    }

    #[tokio::test]
    async fn set_data_updates_committed_node() {
        let storage = temp_storage("set_data_updates");
        let path = Path::parse("/a").unwrap();
        let create_op = CreateNode {
            path: path.clone(),
            data_b64: b"old".to_vec(),
            flags: CreateFlags::default(),
        };
        let mut create = CreateNodeExecutor::new(create_op, ExecutorConfig::default());
        create.lock_and_read(&storage).await;
        create.commit_and_unlock(&storage).await;

        let set_op = SetData {
            path,
            data_b64: b"new".to_vec(),
            version: None,
        };
        let mut set = SetDataExecutor::new(set_op, ExecutorConfig::default());
        let (ok, _) = set.lock_and_read(&storage).await;
        assert!(ok);
        let (ok, reply) = set.commit_and_unlock(&storage).await;
        assert!(ok, "{reply:?}");
        assert_eq!(set.node.as_ref().unwrap().data_b64, b"new".to_vec());
    }

    #[tokio::test]
    async fn delete_root_fails_with_not_empty() {
        let storage = temp_storage("delete_root");
        let op = DeleteNode {
            path: Path::root(),
            version: None,
        };
        let mut executor = DeleteNodeExecutor::new(op, ExecutorConfig::default());
        let (ok, reply) = executor.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NotEmpty));
    }

    #[tokio::test]
    async fn delete_node_with_children_fails_with_not_empty() {
        let storage = temp_storage("delete_with_children");
        let parent_op = CreateNode {
            path: Path::parse("/a").unwrap(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut parent = CreateNodeExecutor::new(parent_op, ExecutorConfig::default());
        parent.lock_and_read(&storage).await;
        parent.commit_and_unlock(&storage).await;

        let child_op = CreateNode {
            path: Path::parse("/a/b").unwrap(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut child = CreateNodeExecutor::new(child_op, ExecutorConfig::default());
        child.lock_and_read(&storage).await;
        child.commit_and_unlock(&storage).await;

        let delete_op = DeleteNode {
            path: Path::parse("/a").unwrap(),
            version: None,
        };
        let mut delete = DeleteNodeExecutor::new(delete_op, ExecutorConfig::default());
        let (ok, reply) = delete.lock_and_read(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::NotEmpty));
    }

    #[tokio::test]
    async fn delete_leaf_node_succeeds_and_removes_from_parent_children() {
        let storage = temp_storage("delete_leaf");
        let parent_op = CreateNode {
            path: Path::parse("/a").unwrap(),
            data_b64: vec![],
            flags: CreateFlags::default(),
        };
        let mut parent = CreateNodeExecutor::new(parent_op, ExecutorConfig::default());
        parent.lock_and_read(&storage).await;
        parent.commit_and_unlock(&storage).await;

        let delete_op = DeleteNode {
            path: Path::parse("/a").unwrap(),
            version: None,
        };
        let mut delete = DeleteNodeExecutor::new(delete_op, ExecutorConfig::default());
        let (ok, reply) = delete.lock_and_read(&storage).await;
        assert!(ok, "{reply:?}");
        let (ok, reply) = delete.commit_and_unlock(&storage).await;
        assert!(ok, "{reply:?}");

        let (_, root) = storage.lock_node(&Path::root(), 999_999).unwrap();
        assert!(root.unwrap().children.is_empty());
        delete.distributor_push(&fk_distributor::ChannelDistributorQueue::default(), &client()).await;
    }

    #[tokio::test]
    async fn deregister_unknown_session_fails() {
        let storage = temp_storage("deregister_unknown");
        let op = DeregisterSession {
            session_id: "sX".to_string(),
        };
        let mut executor = DeregisterSessionExecutor::new(op, ExecutorConfig::default());
        executor.lock_and_read(&storage).await;
        let (ok, reply) = executor.commit_and_unlock(&storage).await;
        assert!(!ok);
        assert_eq!(reply.reason, Some(Reason::SessionDoesNotExist));
    }
}
