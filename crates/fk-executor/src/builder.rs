use tracing::error;

use fk_core::{CreateNode, DeleteNode, DeregisterSession, EventEnvelope, Reason, Reply, SetData};

use crate::executor::{
    CreateNodeExecutor, DeleteNodeExecutor, DeregisterSessionExecutor, Executor, ExecutorConfig,
    SetDataExecutor,
};

/// Parses an event envelope into a boxed `Executor` and an immediate reply
/// (spec.md §4.3 "Dispatch"). `None` alongside a failure reply means the
/// event never reaches a lock-and-read phase at all — either the operation
/// string is unrecognized or the required fields for that operation could
/// not be parsed.
pub fn build(event: &EventEnvelope, config: ExecutorConfig) -> (Option<Box<dyn Executor>>, Reply) {
    match event.operation.as_str() {
        "create_node" => match CreateNode::deserialize(event) {
            Some(op) => (
                Some(Box::new(CreateNodeExecutor::new(op, config))),
                Reply::empty(),
            ),
            None => malformed(event),
        },
        "set_data" => match SetData::deserialize(event) {
            Some(op) => (
                Some(Box::new(SetDataExecutor::new(op, config))),
                Reply::empty(),
            ),
            None => malformed(event),
        },
        "delete_node" => match DeleteNode::deserialize(event) {
            Some(op) => (
                Some(Box::new(DeleteNodeExecutor::new(op, config))),
                Reply::empty(),
            ),
            None => malformed(event),
        },
        "deregister_session" => match DeregisterSession::deserialize(event) {
            Some(op) => (
                Some(Box::new(DeregisterSessionExecutor::new(op, config))),
                Reply::empty(),
            ),
            None => malformed(event),
        },
        other => {
            error!(
                event_id = %event.event_id,
                timestamp = %event.timestamp,
                operation = other,
                "unrecognized operation"
            );
            (None, Reply::failure(Reason::IncorrectRequest))
        }
    }
}

fn malformed(event: &EventEnvelope) -> (Option<Box<dyn Executor>>, Reply) {
    error!(
        event_id = %event.event_id,
        timestamp = %event.timestamp,
        operation = %event.operation,
        "malformed event fields"
    );
    (None, Reply::failure(Reason::IncorrectRequest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(op: &str) -> EventEnvelope {
        EventEnvelope {
            operation: op.to_string(),
            event_id: "e1".to_string(),
            timestamp: "1700000000".to_string(),
            path: None,
            data: None,
            session_id: None,
            flags: None,
            version: None,
        }
    }

    #[test]
    fn unknown_operation_is_incorrect_request() {
        let (executor, reply) = build(&envelope("frobnicate"), ExecutorConfig::default());
        assert!(executor.is_none());
        assert_eq!(reply.reason, Some(Reason::IncorrectRequest));
    }

    #[test]
    fn malformed_create_node_is_incorrect_request() {
        let (executor, reply) = build(&envelope("create_node"), ExecutorConfig::default());
        assert!(executor.is_none());
        assert_eq!(reply.reason, Some(Reason::IncorrectRequest));
    }

    #[test]
    fn well_formed_create_node_builds_an_executor() {
        let mut e = envelope("create_node");
        e.path = Some("/a".to_string());
        e.data = Some("AA==".to_string());
        let (executor, reply) = build(&e, ExecutorConfig::default());
        assert!(executor.is_some());
        assert!(reply.status.is_none());
    }
}
