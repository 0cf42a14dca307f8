use serde::{Deserialize, Serialize};

/// Hints carried on `create_node` requests. Both are reserved hooks: parsed
/// and stored on the request, never enforced by this core (spec.md §4.3,
/// §9 Open Questions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFlags {
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub sequential: bool,
}

/// The incoming event envelope consumed by the dispatch builder (spec.md
/// §6). Operation-specific fields are all optional here; each
/// `RequestOperation::deserialize` validates the subset it needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub operation: String,
    pub event_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub flags: Option<CreateFlags>,
    #[serde(default)]
    pub version: Option<i64>,
}
