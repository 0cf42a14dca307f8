//! fk-rpc
//!
//! JSON-RPC 2.0 server exposing the write path (spec.md §1, ambient
//! transport per SPEC_FULL.md §5 — out of scope for spec.md itself, carried
//! because a coordinator with no network surface isn't a deployable node).
//!
//! Namespace: "fk"
//! Methods:
//!   fk_submitEvent — run an event through lock_and_read / commit_and_unlock
//!                    / distributor_push, short-circuiting on the first
//!                    failed phase
//!   fk_getVersion  — node and protocol version information

pub mod api;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerState};
pub use types::{RpcEvent, RpcReply, RpcVersionInfo};
