//! End-to-end smoke test for fk-node.
//!
//! Starts a real node process against a fresh sled store, submits write
//! events over JSON-RPC, and asserts the replies match the write-path
//! contract.
//!
//! Run with:
//!   cargo test -p fk-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::HttpClientBuilder;
use jsonrpsee::rpc_params;

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for_rpc(client: &jsonrpsee::http_client::HttpClient, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if client
            .request::<fk_rpc::RpcVersionInfo, _>("fk_getVersion", rpc_params![])
            .await
            .is_ok()
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

fn event(operation: &str, event_id: &str, path: Option<&str>, data: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "operation": operation,
        "event_id": event_id,
        "timestamp": "1700000000",
        "path": path,
        "data": data,
        "session_id": "session-1",
        "flags": null,
        "version": null,
    })
}

#[tokio::test]
async fn smoke_create_set_delete() {
    let data_dir = std::env::temp_dir().join(format!("fk_node_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);

    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");

    let node_bin = env!("CARGO_BIN_EXE_fk-node");
    let child = Command::new(node_bin)
        .args([
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--rpc-addr",
            &format!("127.0.0.1:{rpc_port}"),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn fk-node");

    let _guard = NodeGuard { child, data_dir };

    let client = HttpClientBuilder::default().build(&rpc_url).unwrap();
    assert!(
        wait_for_rpc(&client, Duration::from_secs(10)).await,
        "fk-node did not become ready within 10 seconds"
    );

    let create: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("create_node", "e1", Some("/a"), Some("QUE="))],
        )
        .await
        .expect("create_node call");
    assert_eq!(create["status"], "success");

    let duplicate: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("create_node", "e2", Some("/a"), Some("QUE="))],
        )
        .await
        .expect("duplicate create_node call");
    assert_eq!(duplicate["status"], "failure");
    assert_eq!(duplicate["reason"], "node_exists");

    let set_data: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("set_data", "e3", Some("/a"), Some("Qg=="))],
        )
        .await
        .expect("set_data call");
    assert_eq!(set_data["status"], "success");

    let delete: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("delete_node", "e4", Some("/a"), None)],
        )
        .await
        .expect("delete_node call");
    assert_eq!(delete["status"], "success");

    let missing: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("set_data", "e5", Some("/a"), Some("Qg=="))],
        )
        .await
        .expect("set_data on deleted node");
    assert_eq!(missing["status"], "failure");
    assert_eq!(missing["reason"], "node_doesnt_exist");

    let deregister: serde_json::Value = client
        .request(
            "fk_submitEvent",
            rpc_params![event("deregister_session", "e6", None, None)],
        )
        .await
        .expect("deregister_session call");
    assert_eq!(deregister["status"], "failure");
    assert_eq!(deregister["reason"], "session_does_not_exist");
}
