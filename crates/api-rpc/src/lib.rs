//! JSON-RPC API Layer
//!
//! Exposes the scheduling engine as versioned JSON-RPC 2.0 methods over HTTP.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::{RpcHandler, RpcServices};
pub use server::{RpcServer, RpcServerConfig};
