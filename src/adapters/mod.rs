//! Infrastructure adapters for external systems.

pub mod http;
pub mod notify;
pub mod sqlite;
