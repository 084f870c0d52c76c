// Hireloop core: scheduling domain, ports and application services
// Storage, HTTP and RPC live in the adapter crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};
