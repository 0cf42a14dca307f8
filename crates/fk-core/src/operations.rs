use base64::Engine;

use crate::envelope::{CreateFlags, EventEnvelope};
use crate::path::Path;

fn decode_data(data: &Option<String>) -> Option<Vec<u8>> {
    let raw = data.as_deref().unwrap_or("");
    base64::engine::general_purpose::STANDARD.decode(raw).ok()
}

/// A parsed, field-validated client request (spec.md §4.3). Each variant has
/// a `deserialize` associated function returning `None` on malformed input
/// (missing/unparseable required fields), which the builder turns into an
/// `incorrect_request` reply.
#[derive(Clone, Debug)]
pub enum RequestOperation {
    CreateNode(CreateNode),
    SetData(SetData),
    DeleteNode(DeleteNode),
    DeregisterSession(DeregisterSession),
}

#[derive(Clone, Debug)]
pub struct CreateNode {
    pub path: Path,
    pub data_b64: Vec<u8>,
    pub flags: CreateFlags,
}

impl CreateNode {
    pub fn deserialize(event: &EventEnvelope) -> Option<Self> {
        let path = Path::parse(event.path.as_deref()?).ok()?;
        let data_b64 = decode_data(&event.data)?;
        let flags = event.flags.unwrap_or_default();
        Some(Self {
            path,
            data_b64,
            flags,
        })
    }
}

#[derive(Clone, Debug)]
pub struct SetData {
    pub path: Path,
    pub data_b64: Vec<u8>,
    pub version: Option<i64>,
}

impl SetData {
    pub fn deserialize(event: &EventEnvelope) -> Option<Self> {
        let path = Path::parse(event.path.as_deref()?).ok()?;
        let data_b64 = decode_data(&event.data)?;
        Some(Self {
            path,
            data_b64,
            version: event.version,
        })
    }
}

#[derive(Clone, Debug)]
pub struct DeleteNode {
    pub path: Path,
    pub version: Option<i64>,
}

impl DeleteNode {
    pub fn deserialize(event: &EventEnvelope) -> Option<Self> {
        let path = Path::parse(event.path.as_deref()?).ok()?;
        Some(Self {
            path,
            version: event.version,
        })
    }
}

#[derive(Clone, Debug)]
pub struct DeregisterSession {
    pub session_id: String,
}

impl DeregisterSession {
    pub fn deserialize(event: &EventEnvelope) -> Option<Self> {
        let session_id = event.session_id.clone()?;
        if session_id.is_empty() {
            return None;
        }
        Some(Self { session_id })
    }
}
