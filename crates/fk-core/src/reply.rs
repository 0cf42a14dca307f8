use serde::{Deserialize, Serialize};

use crate::path::Path;

/// Failure reasons surfaced by the write path (spec.md §6, §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NodeExists,
    NodeDoesntExist,
    NotEmpty,
    SessionDoesNotExist,
    IncorrectRequest,
    RetryExhausted,
    Unknown,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::NodeExists => "node_exists",
            Reason::NodeDoesntExist => "node_doesnt_exist",
            Reason::NotEmpty => "not_empty",
            Reason::SessionDoesNotExist => "session_does_not_exist",
            Reason::IncorrectRequest => "incorrect_request",
            Reason::RetryExhausted => "retry_exhausted",
            Reason::Unknown => "unknown",
        }
    }
}

/// The reply dictionary returned from each phase (spec.md §6). Terminal
/// phases always carry `status`; failures carry `reason` and the relevant
/// `path`/`session_id`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Reply {
    pub status: Option<&'static str>,
    pub reason: Option<Reason>,
    pub path: Option<String>,
    pub session_id: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: Some("success"),
            ..Default::default()
        }
    }

    pub fn ok_session(session_id: impl Into<String>) -> Self {
        Self {
            status: Some("success"),
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failure(reason: Reason) -> Self {
        Self {
            status: Some("failure"),
            reason: Some(reason),
            ..Default::default()
        }
    }

    pub fn failure_path(reason: Reason, path: &Path) -> Self {
        Self {
            status: Some("failure"),
            reason: Some(reason),
            path: Some(path.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn failure_session(reason: Reason, session_id: impl Into<String>) -> Self {
        Self {
            status: Some("failure"),
            reason: Some(reason),
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }
}
