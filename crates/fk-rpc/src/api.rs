use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{RpcEvent, RpcReply, RpcVersionInfo};

/// fkcoord JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "fk_" via `namespace = "fk"`.
#[rpc(server, namespace = "fk")]
pub trait FkApi {
    /// Submit a write event (`create_node` / `set_data` / `delete_node` /
    /// `deregister_session`) and run it through the three-phase executor.
    /// Returns the terminal reply of whichever phase short-circuited, or the
    /// success reply of `distributor_push` if all phases completed.
    #[method(name = "submitEvent")]
    async fn submit_event(&self, event: RpcEvent) -> RpcResult<RpcReply>;

    /// Return node and protocol version information.
    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;
}
