use serde::{Deserialize, Serialize};

use fk_core::{CreateFlags, Reason, Reply};

/// Wire shape of a client write request (spec.md §4.2 "Event envelope").
/// Mirrors `fk_core::EventEnvelope` field-for-field but is the type jsonrpsee
/// actually (de)serializes at the RPC boundary, kept separate so the core
/// envelope never has to carry `#[derive(Serialize)]` bounds it doesn't
/// otherwise need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEvent {
    pub operation: String,
    pub event_id: String,
    pub timestamp: String,
    pub path: Option<String>,
    pub data: Option<String>,
    pub session_id: Option<String>,
    pub flags: Option<CreateFlags>,
    pub version: Option<i64>,
}

impl From<RpcEvent> for fk_core::EventEnvelope {
    fn from(e: RpcEvent) -> Self {
        fk_core::EventEnvelope {
            operation: e.operation,
            event_id: e.event_id,
            timestamp: e.timestamp,
            path: e.path,
            data: e.data,
            session_id: e.session_id,
            flags: e.flags,
            version: e.version,
        }
    }
}

/// JSON-serializable counterpart of `fk_core::Reply` returned from
/// `submitEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub status: Option<String>,
    pub reason: Option<String>,
    pub path: Option<String>,
    pub session_id: Option<String>,
}

impl From<Reply> for RpcReply {
    fn from(r: Reply) -> Self {
        Self {
            status: r.status.map(str::to_string),
            reason: r.reason.map(Reason::as_str).map(str::to_string),
            path: r.path,
            session_id: r.session_id,
        }
    }
}

/// Node / protocol version information returned by `fk_getVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionInfo {
    pub node_version: String,
    pub protocol_version: String,
}
