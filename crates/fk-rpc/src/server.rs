use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::server::{Server, ServerHandle};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use fk_distributor::{Client, DistributorQueue};
use fk_executor::{ExecutorConfig, Phase, PhaseTimer, TimingStatistics};
use fk_storage::SystemStorage;

use crate::api::FkApiServer;
use crate::types::{RpcEvent, RpcReply, RpcVersionInfo};

/// Shared state passed to the RPC server — the write path's three
/// collaborators plus the executor's retry bounds and timing stats.
pub struct RpcServerState {
    pub storage: Arc<dyn SystemStorage>,
    pub queue: Arc<dyn DistributorQueue>,
    pub stats: Arc<TimingStatistics>,
    pub executor_config: ExecutorConfig,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers.
    /// Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl FkApiServer for RpcServer {
    async fn submit_event(&self, event: RpcEvent) -> RpcResult<RpcReply> {
        let client = Client {
            session_id: event.session_id.clone().unwrap_or_default(),
        };
        let envelope: fk_core::EventEnvelope = event.into();

        let total_timer = PhaseTimer::start(&self.state.stats, Phase::Total);

        let (executor, reply) = fk_executor::build(&envelope, self.state.executor_config);
        let Some(mut executor) = executor else {
            total_timer.finish();
            return Ok(reply.into());
        };

        let lock_timer = PhaseTimer::start(&self.state.stats, Phase::Lock);
        let (ok, reply) = executor.lock_and_read(self.state.storage.as_ref()).await;
        lock_timer.finish();
        if !ok {
            total_timer.finish();
            return Ok(reply.into());
        }

        let commit_timer = PhaseTimer::start(&self.state.stats, Phase::Commit);
        let (ok, reply) = executor.commit_and_unlock(self.state.storage.as_ref()).await;
        commit_timer.finish();
        if !ok {
            total_timer.finish();
            return Ok(reply.into());
        }

        let push_timer = PhaseTimer::start(&self.state.stats, Phase::Push);
        executor
            .distributor_push(self.state.queue.as_ref(), &client)
            .await;
        push_timer.finish();

        self.state.stats.add_repetition();
        total_timer.finish();
        Ok(reply.into())
    }

    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo {
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "1".to_string(),
        })
    }
}
