pub mod constants;
pub mod envelope;
pub mod error;
pub mod node;
pub mod operations;
pub mod path;
pub mod reply;

pub use envelope::{CreateFlags, EventEnvelope};
pub use error::FkError;
pub use node::{Node, NodeAttributeSet, Version};
pub use operations::{CreateNode, DeleteNode, DeregisterSession, RequestOperation, SetData};
pub use path::Path;
pub use reply::{Reason, Reply};
